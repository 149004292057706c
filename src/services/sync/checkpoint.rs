use std::future::Future;

use color_eyre::eyre::{Result, WrapErr};
use sea_orm::{ActiveModelBehavior, ActiveValue::Set, EntityTrait};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::database::Database;
use crate::entities;

/// Run a named workflow step at most once per run.
///
/// If the step already has a recorded result for this run, the closure is not
/// invoked and the recorded value is returned. Otherwise the closure runs and
/// its result is durably recorded before it is handed back, so a restarted
/// run resumes at the first step with no recording. Failed steps record
/// nothing and will run again.
pub async fn checkpoint<T, F, Fut>(db: &Database, run_id: &str, name: &str, step: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let recorded = entities::sync_run_step::Entity::find_by_id((run_id.to_string(), name.to_string()))
        .one(&db.conn)
        .await
        .wrap_err_with(|| format!("Failed to look up recorded step '{name}'"))?;

    if let Some(recorded) = recorded {
        tracing::debug!(run_id, step = name, "reusing recorded step result");
        return serde_json::from_str(&recorded.output)
            .wrap_err_with(|| format!("Failed to parse recorded result of step '{name}'"));
    }

    let value = step().await?;

    let model = entities::sync_run_step::ActiveModel {
        run_id: Set(run_id.to_string()),
        name: Set(name.to_string()),
        output: Set(serde_json::to_string(&value)
            .wrap_err_with(|| format!("Failed to serialize result of step '{name}'"))?),
        ..entities::sync_run_step::ActiveModel::new()
    };
    entities::sync_run_step::Entity::insert(model)
        .exec(&db.conn)
        .await
        .wrap_err_with(|| format!("Failed to record result of step '{name}'"))?;

    Ok(value)
}
