//! Shared test harness modules for the rapport CLI.

use super::*;

mod helpers;
