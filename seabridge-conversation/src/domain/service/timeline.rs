//! 会话时间线
//!
//! 按 (sent_at, id) 升序排列，同一 ID 至多出现一次。

use crate::domain::model::Message;
use crate::domain::service::merge;

/// upsert 结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Merged,
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    messages: Vec<Message>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: impl IntoIterator<Item = Message>) -> Self {
        let mut timeline = Self::new();
        for message in messages {
            timeline.upsert(message);
        }
        timeline
    }

    /// 插入或合并（重复到达的消息只合并 variants）
    pub fn upsert(&mut self, message: Message) -> UpsertOutcome {
        if let Some(index) = self.position(&message.id) {
            let merged = merge::merge_message(&self.messages[index], &message);
            self.messages[index] = merged;
            return UpsertOutcome::Merged;
        }

        let index = self
            .messages
            .partition_point(|m| (m.sent_at, m.id.as_str()) < (message.sent_at, message.id.as_str()));
        self.messages.insert(index, message);
        UpsertOutcome::Inserted
    }

    /// 替换为已合并好的消息（ID 与发送时间不变，位置不变）
    pub fn replace(&mut self, message: Message) -> bool {
        match self.position(&message.id) {
            Some(index) => {
                self.messages[index] = message;
                true
            }
            None => false,
        }
    }

    pub fn apply_edit(&mut self, id: &str, content: &str) -> bool {
        match self.position(id) {
            Some(index) => {
                self.messages[index] = merge::apply_edit(&self.messages[index], content);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Message> {
        self.position(id).map(|index| self.messages.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.position(id).map(|index| &self.messages[index])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.clone()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MessageType, Variants};
    use chrono::{TimeZone, Utc};

    fn message(id: &str, second: u32) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "parent-1".to_string(),
            content: format!("message {}", id),
            message_type: MessageType::Text,
            sent_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, second).unwrap(),
            variants: Variants::new(),
        }
    }

    fn ids(timeline: &Timeline) -> Vec<String> {
        timeline.iter().map(|m| m.id.clone()).collect()
    }

    #[test]
    fn test_ordered_by_sent_at_then_id() {
        let timeline = Timeline::from_messages([
            message("c", 3),
            message("b", 1),
            message("a", 1),
            message("d", 2),
        ]);
        assert_eq!(ids(&timeline), vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn test_duplicate_is_merged_not_appended() {
        let mut timeline = Timeline::new();
        assert_eq!(timeline.upsert(message("m1", 0)), UpsertOutcome::Inserted);
        assert_eq!(timeline.upsert(message("m1", 0)), UpsertOutcome::Merged);
        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn test_edit_and_remove() {
        let mut timeline = Timeline::from_messages([message("m1", 0), message("m2", 1)]);
        assert!(timeline.apply_edit("m1", "edited"));
        assert_eq!(timeline.get("m1").unwrap().content, "edited");
        assert!(!timeline.apply_edit("missing", "x"));

        assert!(timeline.remove("m2").is_some());
        assert!(timeline.remove("m2").is_none());
        assert_eq!(ids(&timeline), vec!["m1"]);
    }
}
