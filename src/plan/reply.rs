use chrono::{DateTime, Utc};

use super::{ApprovalDecision, PlanId, Verdict};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    Approve,
    Reject,
}

/// A parsed `/approve <ref>` or `/reject <ref> [reason]` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub action: ReplyAction,
    /// Plan reference as typed: usually the 8-character id prefix.
    pub reference: String,
    /// Trailing free text (the rejection reason, or a note on approval).
    pub comment: Option<String>,
}

impl Reply {
    /// Turn the reply into a decision once the reference has been resolved.
    pub fn into_decision(
        self,
        plan_id: PlanId,
        approver: impl Into<String>,
        now: DateTime<Utc>,
    ) -> ApprovalDecision {
        let verdict = match self.action {
            ReplyAction::Approve => Verdict::Approve,
            ReplyAction::Reject => Verdict::Reject,
        };
        let decision = ApprovalDecision::new(plan_id, verdict, approver, now);
        match self.comment {
            Some(comment) => decision.with_comment(comment),
            None => decision,
        }
    }
}

/// Parse a reviewer's reply. Returns `None` for anything that is not a
/// decision command with a plan reference.
///
/// Chat-style bot suffixes (`/approve@opsbot`) are accepted.
pub fn parse_reply(text: &str) -> Option<Reply> {
    let (command, rest) = split_word(text.trim())?;
    let command = command.split_once('@').map_or(command, |(c, _)| c);
    let action = match command.to_ascii_lowercase().as_str() {
        "/approve" => ReplyAction::Approve,
        "/reject" => ReplyAction::Reject,
        _ => return None,
    };

    let (reference, rest) = split_word(rest)?;
    let comment = Some(rest.trim()).filter(|c| !c.is_empty()).map(String::from);

    Some(Reply {
        action,
        reference: reference.to_ascii_lowercase(),
        comment,
    })
}

/// First whitespace-delimited word and the remainder.
fn split_word(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    Some(text.split_once(char::is_whitespace).unwrap_or((text, "")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve() {
        let r = parse_reply("/approve 0123abcd").unwrap();
        assert_eq!(r.action, ReplyAction::Approve);
        assert_eq!(r.reference, "0123abcd");
        assert!(r.comment.is_none());
    }

    #[test]
    fn reject_with_reason() {
        let r = parse_reply("  /reject   0123ABCD   change freeze until Monday ").unwrap();
        assert_eq!(r.action, ReplyAction::Reject);
        assert_eq!(r.reference, "0123abcd");
        assert_eq!(r.comment.as_deref(), Some("change freeze until Monday"));
    }

    #[test]
    fn bot_suffix() {
        assert_eq!(
            parse_reply("/Approve@opsbot abc").unwrap().action,
            ReplyAction::Approve
        );
    }

    #[test]
    fn not_a_reply() {
        assert!(parse_reply("").is_none());
        assert!(parse_reply("/approve").is_none());
        assert!(parse_reply("/approve   ").is_none());
        assert!(parse_reply("approve 0123abcd").is_none());
        assert!(parse_reply("/deploy 0123abcd").is_none());
    }

    #[test]
    fn into_decision() {
        let now = Utc::now();
        let d = parse_reply("/reject abc not now")
            .unwrap()
            .into_decision(PlanId::from_string("abc-123"), "carol", now);
        assert_eq!(d.verdict, Verdict::Reject);
        assert_eq!(d.plan_id.as_str(), "abc-123");
        assert_eq!(d.approver, "carol");
        assert_eq!(d.comment.as_deref(), Some("not now"));
        assert_eq!(d.timestamp, now);
    }
}
