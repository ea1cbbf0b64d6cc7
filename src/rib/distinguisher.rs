use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::{self, Deserialize, Deserializer, Serialize, Serializer};

use crate::utils::{ipv4_from_str, number_from_str, split_admin_assigned, ParseError};

/// Route Distinguisher, either AS-based (type 0) or IP-based (type 1)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteDistinguisher {
    As { asn: u32, assigned: u32 },
    Ip { address: Ipv4Addr, assigned: u16 },
}

impl RouteDistinguisher {
    /// Instance RDs are derived from the router address and instance index
    pub fn from_address(address: Ipv4Addr, index: u16) -> Self {
        RouteDistinguisher::Ip {
            address,
            assigned: index,
        }
    }
}

impl fmt::Display for RouteDistinguisher {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RouteDistinguisher::As { asn, assigned } => write!(f, "{}:{}", asn, assigned),
            RouteDistinguisher::Ip { address, assigned } => write!(f, "{}:{}", address, assigned),
        }
    }
}

impl FromStr for RouteDistinguisher {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (admin, assigned) = split_admin_assigned(value.trim(), "route distinguisher")?;
        if admin.contains('.') {
            Ok(RouteDistinguisher::Ip {
                address: ipv4_from_str(admin, "route distinguisher address")?,
                assigned: number_from_str(assigned, "route distinguisher value")?,
            })
        } else {
            Ok(RouteDistinguisher::As {
                asn: number_from_str(admin, "route distinguisher ASN")?,
                assigned: number_from_str(assigned, "route distinguisher value")?,
            })
        }
    }
}

impl Serialize for RouteDistinguisher {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RouteDistinguisher {
    fn deserialize<D>(deserializer: D) -> Result<RouteDistinguisher, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rd() {
        let rd: RouteDistinguisher = "10.1.1.1:65535".parse().unwrap();
        assert_eq!(
            rd,
            RouteDistinguisher::Ip {
                address: Ipv4Addr::new(10, 1, 1, 1),
                assigned: 65535
            }
        );
        assert_eq!(rd.to_string(), "10.1.1.1:65535");

        let rd: RouteDistinguisher = "64512:70000".parse().unwrap();
        assert_eq!(
            rd,
            RouteDistinguisher::As {
                asn: 64512,
                assigned: 70000
            }
        );
        assert!("10.1.1.1:65536".parse::<RouteDistinguisher>().is_err());
        assert!("10.1.1.1".parse::<RouteDistinguisher>().is_err());
    }

    #[test]
    fn test_from_address() {
        let rd = RouteDistinguisher::from_address(Ipv4Addr::new(127, 0, 0, 1), 3);
        assert_eq!(rd.to_string(), "127.0.0.1:3");
    }
}
