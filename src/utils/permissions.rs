// src/utils/permissions.rs

use std::str::FromStr;

use crate::{error::AppError, utils::jwt::Claims};

/// Permission codes checked at the start of every action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    QuizView,
    QuizCreate,
    QuizEdit,
    QuizPublish,
    QuizDelete,
    QuizTake,
    QuizGrade,
}

impl Permission {
    pub fn code(&self) -> &'static str {
        match self {
            Permission::QuizView => "quiz.view",
            Permission::QuizCreate => "quiz.create",
            Permission::QuizEdit => "quiz.edit",
            Permission::QuizPublish => "quiz.publish",
            Permission::QuizDelete => "quiz.delete",
            Permission::QuizTake => "quiz.take",
            Permission::QuizGrade => "quiz.grade",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Instructor,
    Admin,
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "instructor" => Ok(Role::Instructor),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::Forbidden(format!("Unknown role '{}'", other))),
        }
    }
}

impl Role {
    pub fn grants(&self, permission: Permission) -> bool {
        use Permission::*;
        match self {
            Role::Admin => true,
            Role::Instructor => matches!(
                permission,
                QuizView | QuizCreate | QuizEdit | QuizPublish | QuizDelete | QuizGrade
            ),
            Role::Student => matches!(permission, QuizView | QuizTake),
        }
    }
}

/// `authorize(subject, permission)`: allow, or a `Forbidden` error naming the code.
pub fn authorize(claims: &Claims, permission: Permission) -> Result<(), AppError> {
    let role: Role = claims.role.parse()?;
    if role.grants(permission) {
        Ok(())
    } else {
        tracing::warn!(user = %claims.sub, permission = permission.code(), "permission denied");
        Err(AppError::Forbidden(format!("Missing permission {}", permission.code())))
    }
}

/// Non-failing variant for shaping responses (e.g. hiding the answer key).
pub fn can(claims: &Claims, permission: Permission) -> bool {
    claims
        .role
        .parse::<Role>()
        .map(|role| role.grants(permission))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            sub: "u-1".to_string(),
            role: role.to_string(),
            exp: 0,
        }
    }

    #[test]
    fn students_take_but_do_not_grade() {
        assert!(authorize(&claims("student"), Permission::QuizTake).is_ok());
        assert!(matches!(
            authorize(&claims("student"), Permission::QuizGrade),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn instructors_manage_but_do_not_take() {
        assert!(authorize(&claims("instructor"), Permission::QuizPublish).is_ok());
        assert!(!can(&claims("instructor"), Permission::QuizTake));
    }

    #[test]
    fn unknown_role_has_no_permissions() {
        assert!(authorize(&claims("guest"), Permission::QuizView).is_err());
        assert!(!can(&claims("guest"), Permission::QuizView));
    }

    #[test]
    fn admin_has_everything() {
        for p in [Permission::QuizTake, Permission::QuizGrade, Permission::QuizDelete] {
            assert!(can(&claims("admin"), p));
        }
    }
}
