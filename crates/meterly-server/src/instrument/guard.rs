use axum::http::{Method, StatusCode};

use meterly_core::error::{MeterlyError, Result};

/// Which of the non-curried labels the middleware has to fill in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LabelPlan {
    code: bool,
    method: bool,
}

impl LabelPlan {
    /// Only `code` and `method` may be left uncurried.
    pub(crate) fn for_remaining(family: &str, remaining: &[&str]) -> Result<Self> {
        let mut plan = LabelPlan {
            code: false,
            method: false,
        };
        for label in remaining {
            match *label {
                "code" => plan.code = true,
                "method" => plan.method = true,
                other => {
                    return Err(MeterlyError::InconsistentLabels(format!(
                        "{family}: label {other} must be curried before instrumenting"
                    )))
                }
            }
        }
        Ok(plan)
    }

    pub(crate) fn method_value(&self, method: &Method) -> Option<String> {
        self.method.then(|| method.as_str().to_ascii_lowercase())
    }

    fn labels<'a>(&self, code: &'a str, method: Option<&'a str>) -> Vec<(&'static str, &'a str)> {
        let mut out = Vec::with_capacity(2);
        if self.code {
            out.push(("code", code));
        }
        if let Some(m) = method {
            out.push(("method", m));
        }
        out
    }
}

/// Runs `record` exactly once, when dropped.
///
/// Status is `None` until the wrapped call returns. A guard dropped without a
/// status means the call future was dropped mid-flight and is recorded as
/// `499`; a panicking call sets `500` before the panic resumes.
pub(crate) struct CallGuard<F>
where
    F: FnMut(&[(&str, &str)]),
{
    plan: LabelPlan,
    method: Option<String>,
    status: Option<StatusCode>,
    record: F,
}

impl<F> CallGuard<F>
where
    F: FnMut(&[(&str, &str)]),
{
    pub(crate) fn new(plan: LabelPlan, method: &Method, record: F) -> Self {
        Self {
            plan,
            method: plan.method_value(method),
            status: None,
            record,
        }
    }

    pub(crate) fn finish(&mut self, status: StatusCode) {
        self.status = Some(status);
    }
}

impl<F> Drop for CallGuard<F>
where
    F: FnMut(&[(&str, &str)]),
{
    fn drop(&mut self) {
        let code = match self.status {
            Some(s) => s.as_str().to_string(),
            None => "499".to_string(),
        };
        let labels = self.plan.labels(&code, self.method.as_deref());
        (self.record)(&labels);
    }
}
