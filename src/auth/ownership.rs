use crate::error::AppError;
use uuid::Uuid;

/// A record that belongs to exactly one user.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// Rejects the caller unless they own `record`. Runs before any mutation.
pub fn ensure_owner<T: Owned + ?Sized>(record: &T, caller: Uuid) -> Result<(), AppError> {
    if record.owner_id() == caller {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only owners are allowed to make changes".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Note(Uuid);

    impl Owned for Note {
        fn owner_id(&self) -> Uuid {
            self.0
        }
    }

    #[test]
    fn owner_passes() {
        let id = Uuid::new_v4();
        assert!(ensure_owner(&Note(id), id).is_ok());
    }

    #[test]
    fn equal_ids_parsed_from_different_spellings_pass() {
        let id = Uuid::new_v4();
        let upper = Uuid::parse_str(&id.to_string().to_uppercase()).unwrap();
        assert!(ensure_owner(&Note(id), upper).is_ok());
    }

    #[test]
    fn stranger_is_rejected() {
        let err = ensure_owner(&Note(Uuid::new_v4()), Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
