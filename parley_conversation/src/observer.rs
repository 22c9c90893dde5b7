use parley_core::SessionStatus;

/// Display collaborator notified by the [`crate::SessionController`].
///
/// All callbacks run on the task that owns the controller.
pub trait SessionObserver {
    fn on_user_message_accepted(&mut self, text: &str);

    fn on_reply_received(&mut self, text: &str);

    fn on_error(&mut self, message: &str);

    fn on_status_changed(&mut self, _status: SessionStatus) {}
}
