use crate::check::{RiskCheck, RiskCheckError, RiskContext};

/// A named, composable set of [`RiskCheck`]s, run in registration order.
/// Every check runs regardless of earlier failures, so an operator gets the
/// full set of breaches in one rejection rather than one at a time.
pub struct RiskEngine {
    checks: Vec<Box<dyn RiskCheck>>,
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine")
            .field("checks", &self.checks.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl Default for RiskEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskEngine {
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    pub fn with_check(mut self, check: impl RiskCheck + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn add_check(&mut self, check: impl RiskCheck + 'static) {
        self.checks.push(Box::new(check));
    }

    /// Runs every registered check and returns every breach, or `Ok(())` if
    /// none fired.
    pub fn evaluate(&self, context: &RiskContext) -> Result<(), Vec<RiskCheckError>> {
        let breaches: Vec<RiskCheckError> = self
            .checks
            .iter()
            .filter_map(|check| check.check(context).err())
            .collect();
        if breaches.is_empty() {
            Ok(())
        } else {
            Err(breaches)
        }
    }
}
