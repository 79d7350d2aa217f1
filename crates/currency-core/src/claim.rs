use crate::types::Account;

/// Ordered set of token contracts whose holders may convert 1:1 into Token1.
#[derive(Debug, Clone, Default)]
pub struct ClaimRegistry {
    tokens: Vec<Account>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, token: &Account) -> bool {
        self.tokens.contains(token)
    }

    /// Returns false when the token was already registered.
    pub fn add(&mut self, token: Account) -> bool {
        if self.contains(&token) {
            return false;
        }
        self.tokens.push(token);
        true
    }

    /// Returns false when the token was not registered.
    pub fn remove(&mut self, token: &Account) -> bool {
        match self.tokens.iter().position(|t| t == token) {
            Some(index) => {
                self.tokens.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn tokens(&self) -> &[Account] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
