//! Onboarding helpers.

use crate::example_gen::{placeholder_example, ExampleGenerator, ExampleRequest};
use log::info;

/// Example text shown next to the goal form of one onboarding step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingExample {
    pub text: String,
    /// True when generation failed and the static example is shown.
    pub is_placeholder: bool,
}

/// Generates an example, falling back to the static one on any failure.
pub fn example_or_placeholder(
    generator: &dyn ExampleGenerator,
    request: &ExampleRequest,
) -> OnboardingExample {
    match generator.generate(request) {
        Ok(text) => OnboardingExample {
            text,
            is_placeholder: false,
        },
        Err(err) => {
            info!(
                "event=onboarding_example module=onboarding status=fallback tier={} reason={}",
                request.goal_type.as_str(),
                err
            );
            OnboardingExample {
                text: placeholder_example(request.goal_type, &request.pillar_name),
                is_placeholder: true,
            }
        }
    }
}
