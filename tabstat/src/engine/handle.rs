//! Single-flight access to the injected engine.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::{ComputationEngine, EngineArg, EngineError, EngineOutput, EngineResult};
use crate::logging::{truncate_field, LogConfig};
use crate::methods::RoutineSignature;

/// Shared handle to a [`ComputationEngine`].
///
/// Every call holds one async mutex for its whole duration, so concurrent
/// dispatches queue instead of interleaving inside the engine.
#[derive(Debug)]
pub struct EngineHandle {
    engine: Arc<dyn ComputationEngine>,
    gate: Mutex<()>,
    log: LogConfig,
}

impl EngineHandle {
    pub fn new(engine: Arc<dyn ComputationEngine>) -> Self {
        Self {
            engine,
            gate: Mutex::new(()),
            log: LogConfig::default(),
        }
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_initialized()
    }

    /// Initializes the engine unless it already is.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> EngineResult<()> {
        let _guard = self.gate.lock().await;
        if self.engine.is_initialized() {
            debug!("Engine already initialized");
            return Ok(());
        }
        match self.engine.initialize().await {
            Ok(()) => {
                info!("Engine initialized");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Engine initialization failed");
                Err(e)
            }
        }
    }

    /// Calls one routine after checking its arguments and engine readiness.
    #[instrument(skip(self, args), fields(routine = signature.name, arg_count = args.len()))]
    pub async fn invoke(
        &self,
        signature: RoutineSignature,
        args: Vec<EngineArg>,
    ) -> EngineResult<EngineOutput> {
        check_signature(&signature, &args)?;

        let _guard = self.gate.lock().await;
        if !self.engine.is_initialized() {
            warn!("Engine called before initialization");
            return Err(EngineError::NotInitialized);
        }

        crate::log_engine!(
            self.log,
            values = args.iter().map(EngineArg::size).sum::<usize>(),
            "Invoking engine routine"
        );
        let output = self.engine.call(signature.name, args).await;
        if let Err(ref e) = output {
            warn!(
                error = %truncate_field(&e.to_string(), self.log.max_field_length),
                "Engine routine failed"
            );
        }
        output
    }
}

fn check_signature(signature: &RoutineSignature, args: &[EngineArg]) -> EngineResult<()> {
    for (position, expected) in signature.args.iter().enumerate() {
        match args.get(position) {
            Some(arg) if arg.kind() == *expected => {}
            Some(arg) => {
                return Err(EngineError::SignatureMismatch {
                    routine: signature.name.to_string(),
                    position,
                    expected: Some(*expected),
                    found: format!("{:?}", arg.kind()),
                })
            }
            None => {
                return Err(EngineError::SignatureMismatch {
                    routine: signature.name.to_string(),
                    position,
                    expected: Some(*expected),
                    found: "nothing".to_string(),
                })
            }
        }
    }
    if let Some(extra) = args.get(signature.args.len()) {
        return Err(EngineError::SignatureMismatch {
            routine: signature.name.to_string(),
            position: signature.args.len(),
            expected: None,
            found: format!("{:?}", extra.kind()),
        });
    }
    Ok(())
}
