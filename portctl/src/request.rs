//! Request parser - turns a request-target into actions.
//!
//! The path grammar is tiny:
//!
//! | target                      | action                          |
//! |-----------------------------|---------------------------------|
//! | `/`                         | none                            |
//! | `/touchcontrol-on` / `-off` | set the touch-control flag      |
//! | `/wifiinfo-on` / `-off`     | set the network-info flag       |
//! | `/P<nn>-on` / `/P<nn>-off`  | drive digital line `nn`         |
//! | `/P<nn>-<percent>pwm`       | set PWM duty of line `nn`       |
//!
//! Matching is by substring presence, so one target may carry several actions
//! (a flag and a line action, say). They are all returned, in a fixed order,
//! and the caller applies every one of them. Anything unrecognised maps to an
//! empty [`Request`].

use crate::display::DisplayFlag;
use crate::table::Level;

/// Upper bound on actions a single target can encode
pub const MAX_ACTIONS: usize = 7;

/// Byte offset of the two-digit line number (`/P<nn>`)
const LINE_DIGITS: core::ops::Range<usize> = 2..4;

/// Byte offset of the percentage in a stripped PWM target (`/P<nn>-<percent>`)
const PERCENT_OFFSET: usize = 5;

/// A parsed intent to mutate a line or a display flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    SetDigital { line: usize, level: Level },
    /// `percent` is unchecked here; the controller rejects values above 100
    SetDuty { line: usize, percent: u32 },
    SetFlag { flag: DisplayFlag, on: bool },
}

/// All actions encoded in one request-target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    actions: heapless::Vec<Action, MAX_ACTIONS>,
    line_action: bool,
}

impl Request {
    /// Parse a request-target; never fails
    pub fn parse(target: &str) -> Self {
        let mut request = Request::default();

        for (pattern, flag, on) in [
            ("touchcontrol-on", DisplayFlag::TouchControl, true),
            ("touchcontrol-off", DisplayFlag::TouchControl, false),
            ("wifiinfo-on", DisplayFlag::WifiInfo, true),
            ("wifiinfo-off", DisplayFlag::WifiInfo, false),
        ] {
            if target.contains(pattern) {
                request.push(Action::SetFlag { flag, on });
            }
        }

        if let Some(line) = line_number(target) {
            if target.contains("on") {
                request.push(Action::SetDigital { line, level: Level::High });
                request.line_action = true;
            }
            if target.contains("off") {
                request.push(Action::SetDigital { line, level: Level::Low });
                request.line_action = true;
            }
            if target.contains("pwm") {
                if let Some(percent) = pwm_percent(target) {
                    request.push(Action::SetDuty { line, percent });
                    request.line_action = true;
                }
            }
        }

        request
    }

    fn push(&mut self, action: Action) {
        // At most four flag actions and three line actions are ever pushed
        let _ = self.actions.push(action);
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// True when the target carried no recognised action
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// True when a line number and a value were both recognised
    pub fn has_line_action(&self) -> bool {
        self.line_action
    }
}

/// Two ASCII digits at the fixed line offset
fn line_number(target: &str) -> Option<usize> {
    let digits = target.as_bytes().get(LINE_DIGITS)?;
    if !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(usize::from(digits[0] - b'0') * 10 + usize::from(digits[1] - b'0'))
}

/// Percentage of a `/P<nn>-<percent>pwm` target
fn pwm_percent(target: &str) -> Option<u32> {
    let stripped = target.trim_matches(|c| matches!(c, 'p' | 'w' | 'm'));
    let digits = stripped.get(PERCENT_OFFSET..)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Request-target of a raw request: the second whitespace-delimited token.
///
/// Returns an empty string when the request has fewer than two tokens.
pub fn request_target(raw: &str) -> &str {
    raw.split_whitespace().nth(1).unwrap_or("")
}
