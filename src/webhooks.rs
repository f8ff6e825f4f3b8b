pub mod wellplayed;
pub use wellplayed::{well_played_webhook, WellPlayedSecret};
