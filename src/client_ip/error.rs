use thiserror::Error;

use super::resolver::IpSource;

/// Errors from the opt-in strict validation of a resolved client IP.
///
/// Resolution itself never fails; this is only produced by
/// [`ResolvedIp::validate`](super::ResolvedIp::validate).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientIpError {
    #[error("Resolved client IP {value:?} from {source_kind} is not an IP address")]
    Unparseable { value: String, source_kind: IpSource },
}
