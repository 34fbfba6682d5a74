pub use crate::aggregate::*;
pub use crate::config::*;

/// A builder for adding survey responses one at a time.
///
/// ```
/// pub use data_defect::builder::SurveyBuilder;
/// pub use data_defect::{Candidate, PreferenceRules};
///
/// let mut builder = SurveyBuilder::new(PreferenceRules {
///     unsure_as: Some(Candidate::Trump),
/// });
///
/// builder.add_response(55, Some(2), Some(1));
/// builder.add_response(55, Some(5), Some(6));
/// builder.add_response(55, None, Some(1));
///
/// let polls = builder.aggregate();
/// assert_eq!(polls.all[0].trump, 1.0);
/// assert_eq!(polls.likely[0].respondents, 1);
/// ```
pub struct SurveyBuilder<P: PreferencePolicy> {
    pub(crate) _policy: P,
    pub(crate) _responses: Vec<Response>,
}

impl<P: PreferencePolicy> SurveyBuilder<P> {
    pub fn new(policy: P) -> SurveyBuilder<P> {
        SurveyBuilder {
            _policy: policy,
            _responses: Vec::new(),
        }
    }

    /// Adds a response from the raw questionnaire codes.
    ///
    /// `intent`: the answer to the turnout intent question, if any. Respondents without
    /// an answer are not considered likely voters.
    pub fn add_response(&mut self, state_fips: u32, preference: Option<u32>, intent: Option<u32>) {
        self.add_response_2(&Response {
            state_fips,
            preference: preference.map(PreferenceCode::from_code),
            likely_voter: intent.map(is_likely_intent).unwrap_or(false),
        })
    }

    pub fn add_response_2(&mut self, response: &Response) {
        self._responses.push(response.clone());
    }

    pub fn len(&self) -> usize {
        self._responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self._responses.is_empty()
    }

    pub fn aggregate(&self) -> AggregatedPolls {
        aggregate_responses(&self._responses, &self._policy)
    }
}
