/*!
Statistics on the quality of state-level election polls.

The data defect correlation measures how much the way a poll was collected correlates with
the outcome it measures. Once it is known, it tells how many respondents of a simple random
sample the poll is worth (its effective sample size), and it can be used to correct polls
before the outcome is known.

All the functions in this crate are pure: they take plain values and return new ones.
Reading and writing tables is left to the caller (see the `polldefect` program).

```
use data_defect::*;

let stats = estimate_defect(&DefectInput {
    poll: 0.52,
    share: 0.50,
    respondents: 1000.0,
    total_votes: 3_000_000.0,
})?;
assert!((stats.effective_sample_size - 625.0).abs() < 1e-6);

let corrected = correct_poll(0.52, stats.sample_ratio, &CorrectionRules::DEFAULT_RULES)?;
assert!((corrected.corrected - 0.6431).abs() < 1e-3);
# Ok::<(), DefectError>(())
```
*/

mod aggregate;
pub mod builder;
mod config;
mod correction;
mod defect;
mod join;
pub mod manual;
mod regression;
pub mod states;

pub use crate::aggregate::*;
pub use crate::config::*;
pub use crate::correction::*;
pub use crate::defect::*;
pub use crate::join::*;
pub use crate::regression::*;
