//! Reduces the raw event stream to semantic actions.
//!
//! Three stages run in arrival order, each holding at most one pending item:
//!
//! 1. consecutive `sendKeys` are concatenated until any other command arrives;
//! 2. a `mouseDown` followed by a nearby `mouseUp` on the same element becomes
//!    a `click`;
//! 3. a `click` followed by a nearby `click` within [`DOUBLE_CLICK_WINDOW`]
//!    becomes a `dblClick`.
//!
//! The normalizer never reads a clock. Arrival instants come from
//! [`StagedCommand::received_at`] and timer expiry is driven by the caller
//! through [`Normalizer::deadline`] and [`Normalizer::expire`].

use std::time::Duration;

use tokio::time::Instant;

use recorder_core::{Action, SemanticAction, StagedCommand};

/// How long a click waits for a second click before it is released.
pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(400);

#[derive(Debug)]
struct PendingKeys {
    template: SemanticAction,
    keys: String,
    received_at: Instant,
}

#[derive(Debug, Default)]
pub struct Normalizer {
    keys: Option<PendingKeys>,
    press: Option<StagedCommand>,
    click: Option<StagedCommand>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded event; returns the actions it released, in order.
    pub fn push(&mut self, staged: StagedCommand) -> Vec<SemanticAction> {
        let mut out = self.expire(staged.received_at);
        self.merge_keys(staged, &mut out);
        out
    }

    /// When the pending click must be released if nothing pre-empts it.
    pub fn deadline(&self) -> Option<Instant> {
        self.click
            .as_ref()
            .map(|click| click.received_at + DOUBLE_CLICK_WINDOW)
    }

    /// Release the pending click if its window has closed at `now`.
    pub fn expire(&mut self, now: Instant) -> Vec<SemanticAction> {
        match self.deadline() {
            Some(deadline) if deadline <= now => self
                .click
                .take()
                .map(StagedCommand::into_action)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Release everything still buffered, stage by stage.
    pub fn flush(&mut self) -> Vec<SemanticAction> {
        let mut out = Vec::new();
        if let Some(keys) = self.keys.take() {
            self.merge_press(keys.into_staged(), &mut out);
        }
        if let Some(press) = self.press.take() {
            self.merge_click(press, &mut out);
        }
        if let Some(click) = self.click.take() {
            out.push(click.into_action());
        }
        out
    }

    pub fn is_idle(&self) -> bool {
        self.keys.is_none() && self.press.is_none() && self.click.is_none()
    }

    fn merge_keys(&mut self, staged: StagedCommand, out: &mut Vec<SemanticAction>) {
        if let Action::SendKeys { keys } = &staged.action.action {
            match &mut self.keys {
                Some(pending) => {
                    pending.keys.push_str(keys);
                    pending.received_at = staged.received_at;
                    // Merged keys belong to the window of the latest fragment.
                    pending.template = staged.action;
                }
                None => {
                    self.keys = Some(PendingKeys {
                        keys: keys.clone(),
                        received_at: staged.received_at,
                        template: staged.action,
                    });
                }
            }
            return;
        }

        if let Some(keys) = self.keys.take() {
            self.merge_press(keys.into_staged(), out);
        }
        self.merge_press(staged, out);
    }

    fn merge_press(&mut self, mut staged: StagedCommand, out: &mut Vec<SemanticAction>) {
        if let Some(press) = self.press.take() {
            match &staged.action.action {
                Action::MouseUp(up) if press.action.is_mergeable_with(&staged.action) => {
                    let click = Action::Click(up.clone());
                    staged.action = staged.action.with_action(click);
                }
                _ => self.merge_click(press, out),
            }
        }

        if matches!(staged.action.action, Action::MouseDown(_)) {
            self.press = Some(staged);
        } else {
            self.merge_click(staged, out);
        }
    }

    fn merge_click(&mut self, mut staged: StagedCommand, out: &mut Vec<SemanticAction>) {
        if let Some(click) = self.click.take() {
            let within_window = staged
                .received_at
                .saturating_duration_since(click.received_at)
                < DOUBLE_CLICK_WINDOW;
            match &staged.action.action {
                Action::Click(second)
                    if within_window && click.action.is_mergeable_with(&staged.action) =>
                {
                    let dbl = Action::DblClick(second.clone());
                    staged.action = staged.action.with_action(dbl);
                }
                _ => out.push(click.into_action()),
            }
        }

        if matches!(staged.action.action, Action::Click(_)) {
            self.click = Some(staged);
        } else {
            out.push(staged.into_action());
        }
    }
}

impl PendingKeys {
    fn into_staged(self) -> StagedCommand {
        let action = self
            .template
            .with_action(Action::SendKeys { keys: self.keys });
        StagedCommand::new(action, self.received_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recorder_core::Pointer;

    fn at(t0: Instant, ms: u64) -> Instant {
        t0 + Duration::from_millis(ms)
    }

    fn staged(action: Action, received_at: Instant) -> StagedCommand {
        StagedCommand::new(SemanticAction::new(0, None, action), received_at)
    }

    fn down(path: &str, x: f64, y: f64) -> Action {
        Action::MouseDown(Pointer::new(path).at(x, y))
    }

    fn up(path: &str, x: f64, y: f64) -> Action {
        Action::MouseUp(Pointer::new(path).at(x, y))
    }

    fn keys(k: &str) -> Action {
        Action::SendKeys {
            keys: k.to_string(),
        }
    }

    fn cmds(actions: &[SemanticAction]) -> Vec<&'static str> {
        actions.iter().map(SemanticAction::cmd).collect()
    }

    #[test]
    fn test_send_keys_merge_until_other_command() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        assert!(n.push(staged(keys("a"), t0)).is_empty());
        assert!(n.push(staged(keys("b"), at(t0, 10))).is_empty());
        assert!(n.push(staged(keys("c"), at(t0, 5000))).is_empty());

        let out = n.push(staged(Action::AcceptAlert, at(t0, 6000)));
        assert_eq!(cmds(&out), vec!["sendKeys", "acceptAlert"]);
        assert_eq!(out[0].action, keys("abc"));
    }

    #[test]
    fn test_merged_keys_take_latest_window() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(StagedCommand::new(SemanticAction::new(0, None, keys("a")), t0));
        n.push(StagedCommand::new(SemanticAction::new(1, None, keys("b")), t0));
        let out = n.flush();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].window, 1);
        assert_eq!(out[0].action, keys("ab"));
    }

    #[test]
    fn test_press_release_becomes_click_with_release_data() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        assert!(n.push(staged(down("#a", 10.0, 10.0), t0)).is_empty());
        assert!(n.push(staged(up("#a", 12.0, 11.0), at(t0, 50))).is_empty());

        let out = n.flush();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].action, Action::Click(Pointer::new("#a").at(12.0, 11.0)));
    }

    #[test]
    fn test_press_release_too_far_apart_stays_unmerged() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(down("#a", 10.0, 10.0), t0));
        let out = n.push(staged(up("#a", 30.0, 10.0), at(t0, 50)));

        assert_eq!(cmds(&out), vec!["mouseDown", "mouseUp"]);
    }

    #[test]
    fn test_press_release_on_other_element_or_frame_stays_unmerged() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(down("#a", 10.0, 10.0), t0));
        let out = n.push(staged(up("#b", 10.0, 10.0), t0));
        assert_eq!(cmds(&out), vec!["mouseDown", "mouseUp"]);

        n.push(staged(down("#a", 10.0, 10.0), t0));
        let in_frame = SemanticAction::new(0, Some("#f".to_string()), up("#a", 10.0, 10.0));
        let out = n.push(StagedCommand::new(in_frame, t0));
        assert_eq!(cmds(&out), vec!["mouseDown", "mouseUp"]);
    }

    #[test]
    fn test_held_keys_leave_pending_press_buffered() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(down("#a", 1.0, 1.0), t0));
        let out = n.push(staged(keys("x"), t0));
        assert!(out.is_empty());

        let out = n.flush();
        assert_eq!(cmds(&out), vec!["mouseDown", "sendKeys"]);
    }

    #[test]
    fn test_pending_press_flushed_before_other_command() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(down("#a", 1.0, 1.0), t0));
        let out = n.push(staged(Action::AcceptAlert, t0));
        assert_eq!(cmds(&out), vec!["mouseDown", "acceptAlert"]);
        assert!(n.is_idle());
    }

    #[test]
    fn test_two_clicks_within_window_become_dbl_click() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(down("#a", 10.0, 10.0), t0));
        n.push(staged(up("#a", 12.0, 11.0), at(t0, 20)));
        n.push(staged(down("#a", 10.0, 10.0), at(t0, 100)));
        let out = n.push(staged(up("#a", 12.0, 11.0), at(t0, 120)));

        assert_eq!(cmds(&out), vec!["dblClick"]);
        assert!(n.is_idle());
    }

    #[test]
    fn test_clicks_outside_window_stay_separate() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(down("#a", 10.0, 10.0), t0));
        n.push(staged(up("#a", 12.0, 11.0), at(t0, 20)));
        assert_eq!(n.deadline(), Some(at(t0, 420)));

        let mut out = n.push(staged(down("#a", 10.0, 10.0), at(t0, 500)));
        assert_eq!(cmds(&out), vec!["click"]);
        out.extend(n.push(staged(up("#a", 12.0, 11.0), at(t0, 520))));
        out.extend(n.flush());

        assert_eq!(cmds(&out), vec!["click", "click"]);
    }

    #[test]
    fn test_expire_releases_click_once() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(Action::Click(Pointer::new("#a").at(1.0, 1.0)), t0));

        assert!(n.expire(at(t0, 399)).is_empty());
        assert_eq!(cmds(&n.expire(at(t0, 400))), vec!["click"]);
        assert!(n.expire(at(t0, 800)).is_empty());
        assert!(n.deadline().is_none());
    }

    #[test]
    fn test_non_click_preempts_pending_click() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(Action::Click(Pointer::new("#a").at(1.0, 1.0)), t0));
        let out = n.push(staged(Action::Url { url: "http://a".to_string() }, at(t0, 10)));

        assert_eq!(cmds(&out), vec!["click", "url"]);
        assert!(n.deadline().is_none());
    }

    #[test]
    fn test_keys_then_click_scenario() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        let mut out = n.push(staged(keys("a"), t0));
        out.extend(n.push(staged(keys("b"), at(t0, 10))));
        out.extend(n.push(staged(Action::Click(Pointer::new("#go").at(5.0, 5.0)), at(t0, 20))));
        out.extend(n.flush());

        assert_eq!(cmds(&out), vec!["sendKeys", "click"]);
        assert_eq!(out[0].action, keys("ab"));
    }

    #[test]
    fn test_flush_releases_all_stages_in_order() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();

        n.push(staged(Action::Click(Pointer::new("#a").at(1.0, 1.0)), t0));
        n.push(staged(down("#b", 1.0, 1.0), t0));
        assert!(n.push(staged(keys("z"), t0)).is_empty());
        let out = n.flush();

        assert_eq!(cmds(&out), vec!["click", "mouseDown", "sendKeys"]);
        assert!(n.is_idle());
    }

    #[test]
    fn test_never_two_consecutive_send_keys() {
        let t0 = Instant::now();
        let mut n = Normalizer::new();
        let mut out = Vec::new();

        for (i, action) in [
            keys("a"),
            keys("b"),
            Action::WaitBody,
            keys("c"),
            Action::CloseWindow,
            keys("d"),
            keys("e"),
        ]
        .into_iter()
        .enumerate()
        {
            out.extend(n.push(staged(action, at(t0, i as u64))));
        }
        out.extend(n.flush());

        assert_eq!(
            cmds(&out),
            vec!["sendKeys", "waitBody", "sendKeys", "closeWindow", "sendKeys"]
        );
        assert!(out
            .windows(2)
            .all(|w| !(w[0].cmd() == "sendKeys" && w[1].cmd() == "sendKeys")));
    }
}
