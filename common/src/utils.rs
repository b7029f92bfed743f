use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{impl_display_for_enum, impl_from_str_for_enum};

/// Number of bundled avatar images handed out at sign-up.
pub const AVATAR_COUNT: u32 = 9;

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    PENDING,
    SETTLED,
}

impl_from_str_for_enum!(SessionStatus, PENDING, SETTLED);
impl_display_for_enum!(SessionStatus, PENDING, SETTLED);

/// Picks one of the bundled avatars, `1.png` through `9.png`.
pub fn random_avatar() -> String {
    let n = rand::thread_rng().gen_range(1..=AVATAR_COUNT);
    format!("{}.png", n)
}
