//! Authentication restrictions
//!
//! A user carries zero or more restriction sets. Every restriction in a set
//! must pass for the set to pass; the user passes if it has no sets or if
//! any one set passes.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{AuthzError, Result};

/// Addresses a restriction is evaluated against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestrictionEnvironment {
    pub client: Option<IpAddr>,
    pub server: Option<IpAddr>,
}

impl RestrictionEnvironment {
    pub fn new(client: Option<IpAddr>, server: Option<IpAddr>) -> Self {
        RestrictionEnvironment { client, server }
    }
}

/// A predicate deciding whether a user may authenticate over a connection.
pub trait AuthenticationRestriction: fmt::Debug + Send + Sync {
    fn validate(&self, env: &RestrictionEnvironment) -> Result<()>;
}

/// An address range, `10.0.0.0/8` or a bare address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CidrRange {
    addr: IpAddr,
    prefix: u8,
}

impl CidrRange {
    pub fn new(addr: IpAddr, prefix: u8) -> Result<Self> {
        let max = if addr.is_ipv4() { 32 } else { 128 };
        if prefix > max {
            return Err(AuthzError::BadValue(format!("prefix /{} too long for {}", prefix, addr)));
        }
        Ok(CidrRange { addr, prefix })
    }

    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (self.addr, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix)).unwrap_or(0);
                u32::from(net) & mask == u32::from(*ip) & mask
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                let mask = u128::MAX.checked_shl(128 - u32::from(self.prefix)).unwrap_or(0);
                u128::from(net) & mask == u128::from(*ip) & mask
            }
            _ => false,
        }
    }
}

impl FromStr for CidrRange {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || AuthzError::BadValue(format!("'{}' is not a valid CIDR range", s));
        match s.split_once('/') {
            Some((addr, prefix)) => {
                let addr: IpAddr = addr.parse().map_err(|_| bad())?;
                let prefix: u8 = prefix.parse().map_err(|_| bad())?;
                CidrRange::new(addr, prefix)
            }
            None => {
                let addr: IpAddr = s.parse().map_err(|_| bad())?;
                let prefix = if addr.is_ipv4() { 32 } else { 128 };
                CidrRange::new(addr, prefix)
            }
        }
    }
}

impl fmt::Display for CidrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

fn parse_ranges<S: AsRef<str>>(ranges: &[S]) -> Result<Vec<CidrRange>> {
    ranges.iter().map(|r| r.as_ref().parse()).collect()
}

fn check_ranges(kind: &str, ranges: &[CidrRange], addr: Option<IpAddr>) -> Result<()> {
    let addr = addr.ok_or_else(|| AuthzError::RestrictionUnmet(format!("{} address is unknown", kind)))?;
    if ranges.iter().any(|r| r.contains(&addr)) {
        Ok(())
    } else {
        Err(AuthzError::RestrictionUnmet(format!("{} address {} is not in an allowed range", kind, addr)))
    }
}

/// Client must connect from one of the listed ranges
#[derive(Debug, Clone)]
pub struct ClientSourceRestriction {
    ranges: Vec<CidrRange>,
}

impl ClientSourceRestriction {
    pub fn new<S: AsRef<str>>(ranges: &[S]) -> Result<Self> {
        Ok(ClientSourceRestriction { ranges: parse_ranges(ranges)? })
    }
}

impl AuthenticationRestriction for ClientSourceRestriction {
    fn validate(&self, env: &RestrictionEnvironment) -> Result<()> {
        check_ranges("client", &self.ranges, env.client)
    }
}

/// Client must connect to one of the listed server addresses
#[derive(Debug, Clone)]
pub struct ServerAddressRestriction {
    ranges: Vec<CidrRange>,
}

impl ServerAddressRestriction {
    pub fn new<S: AsRef<str>>(ranges: &[S]) -> Result<Self> {
        Ok(ServerAddressRestriction { ranges: parse_ranges(ranges)? })
    }
}

impl AuthenticationRestriction for ServerAddressRestriction {
    fn validate(&self, env: &RestrictionEnvironment) -> Result<()> {
        check_ranges("server", &self.ranges, env.server)
    }
}

/// Restrictions that must all pass together.
#[derive(Debug, Clone, Default)]
pub struct RestrictionSet {
    restrictions: Vec<Arc<dyn AuthenticationRestriction>>,
}

impl RestrictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, restriction: impl AuthenticationRestriction + 'static) -> Self {
        self.restrictions.push(Arc::new(restriction));
        self
    }

    pub fn validate(&self, env: &RestrictionEnvironment) -> Result<()> {
        self.restrictions.iter().try_for_each(|r| r.validate(env))
    }
}

/// Passes when `sets` is empty or any set passes. Reports the last failure otherwise.
pub fn validate_restriction_sets(sets: &[RestrictionSet], env: &RestrictionEnvironment) -> Result<()> {
    let mut last_err = None;
    for set in sets {
        match set.validate(env) {
            Ok(()) => return Ok(()),
            Err(e) => last_err = Some(e),
        }
    }
    last_err.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_cidr_contains() {
        let range: CidrRange = "10.0.0.0/8".parse().unwrap();
        assert!(range.contains(&ip("10.1.2.3")));
        assert!(!range.contains(&ip("11.0.0.1")));
        assert!(!range.contains(&ip("::1")));

        let single: CidrRange = "127.0.0.1".parse().unwrap();
        assert!(single.contains(&ip("127.0.0.1")));
        assert!(!single.contains(&ip("127.0.0.2")));

        let everything: CidrRange = "0.0.0.0/0".parse().unwrap();
        assert!(everything.contains(&ip("192.168.1.1")));

        let v6: CidrRange = "fe80::/10".parse().unwrap();
        assert!(v6.contains(&ip("fe80::1")));
    }

    #[test]
    fn test_cidr_invalid() {
        assert!("10.0.0.0/33".parse::<CidrRange>().is_err());
        assert!("not-an-ip".parse::<CidrRange>().is_err());
        assert!("10.0.0.0/x".parse::<CidrRange>().is_err());
    }

    #[test]
    fn test_sets_any_of_all_of() {
        let env = RestrictionEnvironment::new(Some(ip("10.0.0.5")), Some(ip("192.168.0.1")));
        let office = RestrictionSet::new()
            .with(ClientSourceRestriction::new(&["10.0.0.0/24"]).unwrap())
            .with(ServerAddressRestriction::new(&["192.168.0.1"]).unwrap());
        let vpn = RestrictionSet::new().with(ClientSourceRestriction::new(&["172.16.0.0/12"]).unwrap());

        assert!(validate_restriction_sets(&[], &env).is_ok());
        assert!(validate_restriction_sets(&[vpn.clone()], &env).is_err());
        assert!(validate_restriction_sets(&[vpn, office], &env).is_ok());
    }

    #[test]
    fn test_unknown_address_fails() {
        let set = RestrictionSet::new().with(ClientSourceRestriction::new(&["0.0.0.0/0"]).unwrap());
        let err = validate_restriction_sets(&[set], &RestrictionEnvironment::default()).unwrap_err();
        assert!(matches!(err, AuthzError::RestrictionUnmet(_)));
    }
}
