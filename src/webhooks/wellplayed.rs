use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    response::{self, status, Responder},
    Request, State,
};
use tracing::{error, info, info_span, trace, Instrument};

use crate::{
    correlation::CorrelationId,
    reconciler::{ReconcileError, Reconciler, WebhookDelivery},
};

mod events;
pub use events::*;

mod signing;
use signing::SignedWellPlayedPayload;

const WP_WEBHOOK_EVENT: &str = "wp-webhook-event";

pub struct WellPlayedSecret(pub String);

#[rocket::post("/webhooks/well-played", data = "<payload>")]
pub async fn well_played_webhook(
    event: EventHeader,
    payload: SignedWellPlayedPayload,
    reconciler: &State<Reconciler>,
) -> Result<&'static str, ReconcileError> {
    let delivery = WebhookDelivery {
        event_type: event.0,
        payload: payload.body,
        message_id: payload.message_id,
        timestamp: payload.timestamp,
        correlation_id: CorrelationId::new(),
    };

    let span = info_span!(
        "delivery",
        correlation_id = %delivery.correlation_id,
        message_id = %delivery.message_id,
        timestamp = %delivery.timestamp
    );
    let action = reconciler.reconcile(&delivery).instrument(span.clone()).await?;
    span.in_scope(|| info!("delivery processed: {}", action));

    Ok("OK")
}

/// Event type of the delivery. Missing or unknown events are `None`, they are acknowledged
/// without doing anything.
pub struct EventHeader(Option<TeamEventType>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for EventHeader {
    type Error = std::convert::Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let event_type = request.headers().get_one(WP_WEBHOOK_EVENT);
        let event = event_type.and_then(TeamEventType::from_header);
        if event.is_none() {
            trace!("ignoring event type {:?}", event_type);
        }

        Outcome::Success(EventHeader(event))
    }
}

impl<'r> Responder<'r, 'static> for ReconcileError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        error!("couldn't process WellPlayed delivery: {}", self);

        // remote error bodies stay in the logs
        let (status, message) = match &self {
            ReconcileError::Payload(_) => (Status::BadRequest, "malformed payload".to_string()),
            ReconcileError::Graph { step, .. } | ReconcileError::Community { step, .. } => {
                (Status::BadGateway, format!("{} failed", step))
            }
        };
        status::Custom(status, message).respond_to(request)
    }
}
