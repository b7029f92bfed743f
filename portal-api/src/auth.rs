use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures::future::{err, ok, Ready};
use points::PointsError;

use crate::errors::ApiError;

pub const WALLET_HEADER: &str = "x-wallet-address";

/// Wallet address the client signed in with. The sign-in flow that proves
/// ownership happens upstream; this only reads the resulting identity.
pub struct WalletIdentity {
    pub wallet_addr: String,
}

impl FromRequest for WalletIdentity {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let wallet = req
            .headers()
            .get(WALLET_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|w| !w.is_empty());

        match wallet {
            Some(wallet) => ok(WalletIdentity {
                wallet_addr: wallet.to_string(),
            }),
            None => err(ApiError::Points(PointsError::Unauthorized)),
        }
    }
}
