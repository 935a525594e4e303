use crate::error::AssertionMismatchError;
use crate::fixture::Fixture;

/// Check a post-state returned by the verifier against the fixture's expectation.
pub fn assert_post_state(
    set: &str,
    fixture: &Fixture,
    actual: Vec<u8>,
) -> Result<(), AssertionMismatchError> {
    if actual == fixture.expected_post_state {
        return Ok(());
    }
    Err(AssertionMismatchError {
        set: set.to_string(),
        index: fixture.index,
        expected: fixture.expected_post_state.clone(),
        actual,
    })
}
