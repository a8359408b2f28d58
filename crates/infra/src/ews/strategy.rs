//! How requests reach a room mailbox's calendar.

use parking_lot::Mutex;
use roomsync_domain::normalize_mailbox;
use tracing::warn;

use super::soap::FolderTarget;

/// Addressing mode for another mailbox's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImpersonationStrategy {
    /// Send an `ExchangeImpersonation` header and use the own calendar.
    ExchangeImpersonation,
    /// No header; address the calendar through `<t:Mailbox>`. Works with
    /// delegate access.
    DistinguishedFolderMailbox,
}

/// Current strategy plus the identities it is applied to.
///
/// Starts in [`ImpersonationStrategy::ExchangeImpersonation`] when an
/// impersonation target is configured, and can fall back once.
#[derive(Debug)]
pub struct StrategyState {
    account: String,
    impersonation: Option<String>,
    current: Mutex<ImpersonationStrategy>,
}

impl StrategyState {
    pub fn new(account: &str, impersonation: Option<&str>) -> Self {
        let impersonation = impersonation.map(normalize_mailbox);
        let current = if impersonation.is_some() {
            ImpersonationStrategy::ExchangeImpersonation
        } else {
            ImpersonationStrategy::DistinguishedFolderMailbox
        };

        Self { account: normalize_mailbox(account), impersonation, current: Mutex::new(current) }
    }

    pub fn current(&self) -> ImpersonationStrategy {
        *self.current.lock()
    }

    pub fn is_impersonating(&self) -> bool {
        self.impersonation.is_some()
            && self.current() == ImpersonationStrategy::ExchangeImpersonation
    }

    /// Address for the `ExchangeImpersonation` header, if one is sent.
    pub fn impersonation_header(&self) -> Option<&str> {
        if self.is_impersonating() {
            self.impersonation.as_deref()
        } else {
            None
        }
    }

    /// Folder element for `mailbox` under the current strategy.
    pub fn folder_for<'a>(&self, mailbox: &'a str) -> FolderTarget<'a> {
        let key = normalize_mailbox(mailbox);
        let runs_as = if self.is_impersonating() {
            self.impersonation.as_deref()
        } else {
            Some(self.account.as_str())
        };

        if runs_as == Some(key.as_str()) {
            FolderTarget::OwnCalendar
        } else {
            FolderTarget::Mailbox(mailbox)
        }
    }

    /// Stop impersonating. Returns `false` when there was nothing to switch.
    pub fn switch_to_delegate(&self) -> bool {
        let mut current = self.current.lock();
        if self.impersonation.is_none()
            || *current == ImpersonationStrategy::DistinguishedFolderMailbox
        {
            return false;
        }

        warn!(
            account = %self.account,
            target = ?self.impersonation,
            "impersonation denied; falling back to delegate folder access"
        );
        *current = ImpersonationStrategy::DistinguishedFolderMailbox;
        true
    }
}
