/// Audio analysis actions offered on numeric resources.
pub mod features;

pub use features::short_term_features;

use crate::error::{ActionError, AnalysisError, ResourceError};
use crate::resource::{NumericArray, Resource};

/// Run short-term feature extraction on a resource's mono signal.
pub fn resource_features(
    resource: &Resource,
    window_secs: f64,
    step_secs: f64,
) -> Result<NumericArray, ActionError> {
    let signal = resource
        .signal()
        .ok_or_else(|| ResourceError::NotNumeric(resource.alias.clone()))?;
    let rate = resource
        .sample_rate()
        .ok_or(AnalysisError::InvalidSampleRate)?;
    Ok(short_term_features(&signal, rate, window_secs, step_secs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;

    #[test]
    fn features_need_a_sample_rate() {
        let plain = Resource::new("plain", ResourceKind::Array(NumericArray::column(vec![0.0; 1000])));
        assert!(matches!(
            resource_features(&plain, 0.05, 0.05),
            Err(ActionError::Analysis(AnalysisError::InvalidSampleRate))
        ));

        let timed = Resource::new(
            "timed",
            ResourceKind::Array(
                NumericArray::column((0..1000).map(|i| (i as f64 * 0.3).sin()).collect())
                    .with_sample_rate(Some(1000.0)),
            ),
        );
        let feats = resource_features(&timed, 0.1, 0.05).unwrap();
        assert_eq!(feats.shape(), (19, 34));
    }
}
