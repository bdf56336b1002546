use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// Address of the calling client
///
/// The socket peer, or the first `X-Forwarded-For` hop when
/// `server.trust_proxy` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        if state.config.server.trust_proxy {
            if let Some(ip) = forwarded_for(&parts.headers) {
                return Ok(Self(ip));
            }
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| Self(addr.ip()))
            .ok_or_else(|| {
                tracing::error!("Peer address missing; the server must be started with connect info");
                ApiError::Internal
            })
    }
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}
