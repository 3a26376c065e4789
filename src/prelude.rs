pub use crate::{
    base::{
        config::Config,
        error::{TriageError, TriageResult},
        types::{Err, Res, Void},
    },
    interaction::{
        assistant::Assistant,
        session::{Phase, TriageSession},
    },
};
pub use anyhow::anyhow;
pub use tracing::{debug, error, info, instrument, warn};
