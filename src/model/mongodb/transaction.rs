use std::time::Duration;

use log::{debug, warn};
use mongodb::{
    error::{Error as DbError, UNKNOWN_TRANSACTION_COMMIT_RESULT},
    ClientSession,
};

use crate::error::Error;

use super::errors::is_transient_transaction_error;

/// How many times a transaction is attempted before a transient failure is
/// reported to the caller.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 8;

/// Pause between attempts, multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Decide whether a failed transaction attempt should be run again, and if
/// so wait out the backoff first. Only transient database errors are retried.
pub async fn should_retry(err: &Error, attempt: u32) -> bool {
    let transient = matches!(err, Error::Db(db_err) if is_transient_transaction_error(db_err));
    if transient && attempt < MAX_TRANSACTION_ATTEMPTS {
        debug!("Transient transaction failure on attempt {attempt}, retrying: {err}");
        rocket::tokio::time::sleep(RETRY_BACKOFF * attempt).await;
        true
    } else {
        false
    }
}

/// Abort the open transaction, if there still is one.
///
/// The server may already have aborted it, so failure here carries no information.
pub async fn abort(session: &mut ClientSession) {
    if let Err(err) = session.abort_transaction().await {
        debug!("Abort of transaction failed: {err}");
    }
}

/// Commit the open transaction, retrying the commit itself while its outcome is unknown.
pub async fn commit(session: &mut ClientSession) -> Result<(), DbError> {
    let mut attempt = 1;
    loop {
        match session.commit_transaction().await {
            Err(err)
                if err.contains_label(UNKNOWN_TRANSACTION_COMMIT_RESULT)
                    && attempt < MAX_TRANSACTION_ATTEMPTS =>
            {
                warn!("Commit outcome unknown on attempt {attempt}, retrying: {err}");
                attempt += 1;
            }
            result => return result,
        }
    }
}
