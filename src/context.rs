//! Connection and operation context passed explicitly into the session

use std::fmt;
use std::net::SocketAddr;

use crate::logical_session::LogicalSessionId;
use crate::restriction::RestrictionEnvironment;

/// The transport a client connected over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp { remote: SocketAddr, local: SocketAddr },
    UnixSocket,
    /// Server-internal client with no transport
    Internal,
}

/// Describes the connection a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    transport: Transport,
}

impl ClientInfo {
    pub fn tcp(remote: SocketAddr, local: SocketAddr) -> Self {
        ClientInfo { transport: Transport::Tcp { remote, local } }
    }

    pub fn unix_socket() -> Self {
        ClientInfo { transport: Transport::UnixSocket }
    }

    pub fn internal() -> Self {
        ClientInfo { transport: Transport::Internal }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Loopback TCP peers and unix socket peers are local
    pub fn is_localhost_connection(&self) -> bool {
        match self.transport {
            Transport::Tcp { remote, .. } => remote.ip().is_loopback(),
            Transport::UnixSocket => true,
            Transport::Internal => false,
        }
    }

    pub fn restriction_environment(&self) -> RestrictionEnvironment {
        match self.transport {
            Transport::Tcp { remote, local } => RestrictionEnvironment::new(Some(remote.ip()), Some(local.ip())),
            Transport::UnixSocket | Transport::Internal => RestrictionEnvironment::default(),
        }
    }
}

impl fmt::Display for ClientInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.transport {
            Transport::Tcp { remote, .. } => write!(f, "{}", remote),
            Transport::UnixSocket => write!(f, "anonymous unix socket"),
            Transport::Internal => write!(f, "internal"),
        }
    }
}

/// Per-operation state handed to request-scoped session calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationContext {
    logical_session_id: Option<LogicalSessionId>,
}

impl OperationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logical_session_id(lsid: LogicalSessionId) -> Self {
        OperationContext { logical_session_id: Some(lsid) }
    }

    pub fn logical_session_id(&self) -> Option<&LogicalSessionId> {
        self.logical_session_id.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_detection() {
        let local = ClientInfo::tcp("127.0.0.1:50000".parse().unwrap(), "127.0.0.1:27017".parse().unwrap());
        let remote = ClientInfo::tcp("10.0.0.7:50000".parse().unwrap(), "10.0.0.1:27017".parse().unwrap());
        assert!(local.is_localhost_connection());
        assert!(!remote.is_localhost_connection());
        assert!(ClientInfo::unix_socket().is_localhost_connection());
        assert!(!ClientInfo::internal().is_localhost_connection());
    }

    #[test]
    fn test_restriction_environment() {
        let client = ClientInfo::tcp("10.0.0.7:50000".parse().unwrap(), "10.0.0.1:27017".parse().unwrap());
        let env = client.restriction_environment();
        assert_eq!(env.client, Some("10.0.0.7".parse().unwrap()));
        assert_eq!(env.server, Some("10.0.0.1".parse().unwrap()));
        assert_eq!(ClientInfo::unix_socket().restriction_environment(), RestrictionEnvironment::default());
    }
}
