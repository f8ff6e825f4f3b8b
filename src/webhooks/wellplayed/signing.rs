use std::io;

use anyhow::anyhow;
use hmac::{Hmac, Mac};
use rocket::{
    data::{ByteUnit, FromData, Outcome},
    http::Status,
    Data, Request,
};
use sha2::Sha256;
use thiserror::Error;
use tracing::trace;

use crate::webhooks::wellplayed::WellPlayedSecret;

const WP_WEBHOOK_SIGNATURE: &str = "wp-webhook-signature";
const WP_WEBHOOK_MESSAGE_ID: &str = "wp-webhook-message-id";
const WP_WEBHOOK_TIMESTAMP: &str = "wp-webhook-timestamp";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("missing `{0}` header")]
    MissingHeader(&'static str),
    #[error("signature isn't hex encoded")]
    MalformedSignature,
    #[error("signature doesn't match payload")]
    Mismatch,
}

/// Checks `signature` against `HMAC-SHA256(secret, message_id || timestamp || body)`.
///
/// The comparison runs in constant time.
pub fn validate_signature(
    secret: &[u8],
    signature: &str,
    message_id: &str,
    timestamp: &str,
    body: &[u8],
) -> Result<(), AuthenticationError> {
    trace!("validating signature...");

    let signature = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => {
            trace!("couldn't decode hex-encoded signature {}", signature);
            return Err(AuthenticationError::MalformedSignature);
        }
    };

    let mac = signing_mac(secret, message_id, timestamp, body);
    mac.verify_slice(&signature).map_err(|_| AuthenticationError::Mismatch)
}

fn signing_mac(secret: &[u8], message_id: &str, timestamp: &str, body: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(message_id.as_bytes());
    mac.update(timestamp.as_bytes());
    mac.update(body);
    mac
}

/// Hex signature WellPlayed would send for this delivery.
#[cfg(test)]
pub(crate) fn sign(secret: &[u8], message_id: &str, timestamp: &str, body: &[u8]) -> String {
    hex::encode(signing_mac(secret, message_id, timestamp, body).finalize().into_bytes())
}

/// A WellPlayed delivery whose signature was checked against the raw request body.
pub struct SignedWellPlayedPayload {
    pub message_id: String,
    pub timestamp: String,
    pub body: Vec<u8>,
}

/// Fallback body cap when Rocket's `json` limit isn't configured, same as Rocket's default for
/// `json`. Deliveries are JSON documents so they share that limit rather than `bytes` (8 KiB).
const LIMIT: ByteUnit = ByteUnit::Mebibyte(1);

fn single_header<'r>(request: &'r Request<'_>, name: &'static str) -> Option<&'r str> {
    let values = request.headers().get(name).collect::<Vec<_>>();
    if values.len() != 1 {
        trace!("couldn't locate {} header", name);
        return None;
    }

    Some(values[0])
}

fn missing_header<'r>(name: &'static str) -> Outcome<'r, SignedWellPlayedPayload> {
    Outcome::Error((
        Status::Unauthorized,
        AuthenticationError::MissingHeader(name).into(),
    ))
}

#[rocket::async_trait]
impl<'r> FromData<'r> for SignedWellPlayedPayload {
    type Error = anyhow::Error;

    async fn from_data(request: &'r Request<'_>, data: Data<'r>) -> Outcome<'r, Self> {
        trace!("received payload on WellPlayed webhook endpoint: {:?}", request);

        let signature = match single_header(request, WP_WEBHOOK_SIGNATURE) {
            Some(signature) => signature,
            None => return missing_header(WP_WEBHOOK_SIGNATURE),
        };
        let message_id = match single_header(request, WP_WEBHOOK_MESSAGE_ID) {
            Some(message_id) => message_id,
            None => return missing_header(WP_WEBHOOK_MESSAGE_ID),
        };
        let timestamp = match single_header(request, WP_WEBHOOK_TIMESTAMP) {
            Some(timestamp) => timestamp,
            None => return missing_header(WP_WEBHOOK_TIMESTAMP),
        };

        let size_limit = request.limits().get("json").unwrap_or(LIMIT);
        let body = match data.open(size_limit).into_bytes().await {
            Ok(b) if b.is_complete() => b.into_inner(),
            Ok(_) => {
                let eof = io::ErrorKind::UnexpectedEof;
                trace!("payload was too big");
                return Outcome::Error((
                    Status::PayloadTooLarge,
                    io::Error::new(eof, "data limit exceeded").into(),
                ));
            }
            Err(e) => return Outcome::Error((Status::BadRequest, e.into())),
        };

        let secret = match request.rocket().state::<WellPlayedSecret>() {
            Some(secret) => secret,
            None => {
                return Outcome::Error((
                    Status::InternalServerError,
                    anyhow!("webhook secret isn't managed by rocket"),
                ))
            }
        };

        if let Err(e) = validate_signature(
            secret.0.as_bytes(),
            signature,
            message_id,
            timestamp,
            &body,
        ) {
            trace!("signature validation failed ({}), stopping here...", e);
            return Outcome::Error((Status::Unauthorized, e.into()));
        }

        trace!("validated WellPlayed payload");
        Outcome::Success(SignedWellPlayedPayload {
            message_id: message_id.to_owned(),
            timestamp: timestamp.to_owned(),
            body,
        })
    }
}
