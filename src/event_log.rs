/// A log of events with persistent history that can be read from a cursor.
///
/// Readers remember the cursor they last saw and ask for everything after it,
/// so one log can serve any number of observers without them having to be
/// registered with the graph.
#[derive(Debug)]
pub struct EventLog<T> {
    messages: Vec<T>,
}

impl<T: Clone> EventLog<T> {
    pub fn new() -> EventLog<T> {
        EventLog {
            messages: Vec::new(),
        }
    }

    pub fn push_messages(&mut self, new_messages: &[T]) {
        self.messages.extend_from_slice(new_messages);
    }

    pub fn push(&mut self, message: T) {
        self.messages.push(message);
    }

    /// Every message pushed after the given cursor. A cursor past the end of
    /// the log yields nothing.
    pub fn since(&self, cursor: u32) -> &[T] {
        let start = (cursor as usize).min(self.messages.len());
        &self.messages[start..]
    }

    pub fn cursor(&self) -> u32 {
        self.messages.len() as u32
    }

    pub fn all(&self) -> &[T] {
        &self.messages
    }
}

impl<T: Clone> Default for EventLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn since_cursor() {
        let mut log = EventLog::new();
        log.push_messages(&[1, 2]);

        let cursor = log.cursor();
        log.push(3);

        assert_eq!(log.since(cursor), &[3]);
        assert_eq!(log.since(0), &[1, 2, 3]);
        assert!(log.since(10).is_empty());
    }
}
