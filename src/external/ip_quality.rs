//! IP-quality lookup collaborator (spec.md §1, §4.7 step 1 VPN-gate).
//! Out of scope: only the interface matters.

use async_trait::async_trait;
use std::net::IpAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpQualityError {
    #[error("ip quality backend unavailable")]
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IpQualityReport {
    pub is_vpn: bool,
    pub fraud_score: u8,
}

#[async_trait]
pub trait IpQualityClient: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> Result<IpQualityReport, IpQualityError>;
}

/// Always-clean double for local development and tests.
pub struct AlwaysCleanIpQualityClient;

#[async_trait]
impl IpQualityClient for AlwaysCleanIpQualityClient {
    async fn lookup(&self, _ip: IpAddr) -> Result<IpQualityReport, IpQualityError> {
        Ok(IpQualityReport {
            is_vpn: false,
            fraud_score: 0,
        })
    }
}
