//! Trigger evaluation with a per-request expression cache.

use std::collections::HashMap;

use tau_messaging_types::Message;

use crate::collaborators::{EvalContext, PredicateError, PredicateEvaluator};

/// Decides whether a message's triggers currently hold.
///
/// Lives for one selection request. Successful expression results are cached by
/// expression text; failures are not, so a later strict pass sees them again.
pub struct TriggerEvaluator<'a> {
    evaluator: &'a dyn PredicateEvaluator,
    context: &'a EvalContext,
    cache: HashMap<String, bool>,
}

impl<'a> TriggerEvaluator<'a> {
    pub fn new(evaluator: &'a dyn PredicateEvaluator, context: &'a EvalContext) -> Self {
        Self {
            evaluator,
            context,
            cache: HashMap::new(),
        }
    }

    /// Returns true when every trigger holds. Evaluation failures count as not eligible.
    pub fn is_eligible(&mut self, message: &Message) -> bool {
        match self.check(message) {
            Ok(eligible) => eligible,
            Err(error) => {
                tracing::debug!(
                    message_id = message.id.as_str(),
                    error = %error,
                    "trigger evaluation failed; treating message as ineligible"
                );
                false
            }
        }
    }

    /// Evaluates triggers in order, stopping at the first false or failing expression.
    pub fn check(&mut self, message: &Message) -> Result<bool, PredicateError> {
        for expression in &message.triggers {
            if !self.evaluate(expression)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn evaluate(&mut self, expression: &str) -> Result<bool, PredicateError> {
        if let Some(cached) = self.cache.get(expression) {
            return Ok(*cached);
        }
        let result = self.evaluator.evaluate(expression, self.context)?;
        self.cache.insert(expression.to_string(), result);
        Ok(result)
    }
}
