use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    domain::{ChatId, UserId},
    Result,
};

// ============== Authorization ==============

/// Who may run a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Any member of an allowed chat.
    Public,
    /// Administrators of an allowed chat.
    Operator,
    /// The configured superuser, from any chat.
    Superuser,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    /// The chat is not on the allow-list; the caller deserves a refusal reply.
    ChatNotAllowed,
    /// Allowed chat, insufficient role; ignored silently.
    Denied,
}

/// Source of chat administrator lists (Telegram `getChatAdministrators`).
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn is_chat_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool>;
}

pub fn is_chat_allowed(chat_id: ChatId, allowed_chats: &[i64]) -> bool {
    allowed_chats.contains(&chat_id.0)
}

pub fn is_superuser(user_id: Option<UserId>, superuser: Option<i64>) -> bool {
    match (user_id, superuser) {
        (Some(u), Some(s)) => u.0 == s,
        _ => false,
    }
}

pub struct Authorizer {
    allowed_chats: Vec<i64>,
    superuser: Option<i64>,
    directory: Arc<dyn AdminDirectory>,
}

impl Authorizer {
    pub fn new(
        allowed_chats: Vec<i64>,
        superuser: Option<i64>,
        directory: Arc<dyn AdminDirectory>,
    ) -> Self {
        Self {
            allowed_chats,
            superuser,
            directory,
        }
    }

    pub async fn authorize(
        &self,
        access: Access,
        chat_id: ChatId,
        user_id: Option<UserId>,
    ) -> Result<Decision> {
        if access == Access::Superuser {
            return Ok(if is_superuser(user_id, self.superuser) {
                Decision::Allowed
            } else {
                Decision::Denied
            });
        }

        if !is_chat_allowed(chat_id, &self.allowed_chats) {
            return Ok(Decision::ChatNotAllowed);
        }
        if access == Access::Public {
            return Ok(Decision::Allowed);
        }

        let Some(user_id) = user_id else {
            return Ok(Decision::Denied);
        };
        if self.directory.is_chat_admin(chat_id, user_id).await? {
            Ok(Decision::Allowed)
        } else {
            Ok(Decision::Denied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeDirectory {
        admins: Vec<(i64, i64)>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl AdminDirectory for FakeDirectory {
        async fn is_chat_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<bool> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.admins.contains(&(chat_id.0, user_id.0)))
        }
    }

    fn authorizer(dir: Arc<FakeDirectory>) -> Authorizer {
        Authorizer::new(vec![-100], Some(7), dir)
    }

    #[tokio::test]
    async fn public_commands_need_an_allowed_chat_only() {
        let dir = Arc::new(FakeDirectory::default());
        let auth = authorizer(dir.clone());
        assert_eq!(
            auth.authorize(Access::Public, ChatId(-100), Some(UserId(1)))
                .await
                .unwrap(),
            Decision::Allowed
        );
        assert_eq!(
            auth.authorize(Access::Public, ChatId(-5), Some(UserId(1)))
                .await
                .unwrap(),
            Decision::ChatNotAllowed
        );
        assert_eq!(dir.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn operator_commands_check_the_admin_list() {
        let dir = Arc::new(FakeDirectory {
            admins: vec![(-100, 2)],
            ..Default::default()
        });
        let auth = authorizer(dir.clone());
        assert_eq!(
            auth.authorize(Access::Operator, ChatId(-100), Some(UserId(2)))
                .await
                .unwrap(),
            Decision::Allowed
        );
        assert_eq!(
            auth.authorize(Access::Operator, ChatId(-100), Some(UserId(3)))
                .await
                .unwrap(),
            Decision::Denied
        );
        assert_eq!(
            auth.authorize(Access::Operator, ChatId(-100), None)
                .await
                .unwrap(),
            Decision::Denied
        );
        // Disallowed chats never reach the admin lookup.
        assert_eq!(
            auth.authorize(Access::Operator, ChatId(-1), Some(UserId(2)))
                .await
                .unwrap(),
            Decision::ChatNotAllowed
        );
        assert_eq!(dir.lookups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn superuser_is_recognised_from_any_chat() {
        let auth = authorizer(Arc::new(FakeDirectory::default()));
        assert_eq!(
            auth.authorize(Access::Superuser, ChatId(7), Some(UserId(7)))
                .await
                .unwrap(),
            Decision::Allowed
        );
        assert_eq!(
            auth.authorize(Access::Superuser, ChatId(-100), Some(UserId(2)))
                .await
                .unwrap(),
            Decision::Denied
        );
    }

    #[test]
    fn superuser_requires_configuration() {
        assert!(!is_superuser(Some(UserId(7)), None));
        assert!(!is_superuser(None, Some(7)));
        assert!(is_superuser(Some(UserId(7)), Some(7)));
    }
}
