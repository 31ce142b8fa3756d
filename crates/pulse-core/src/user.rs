//! Users — the identities every record refers to.
//!
//! Users are owned by the (external) authentication subsystem. The core only
//! reads them: to resolve a caller's role, to build the roster, and to check
//! parent/child links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// What a user is allowed to do.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Student,
  Teacher,
  Parent,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub user_id:        Uuid,
  pub name:           String,
  pub email:          String,
  pub role:           Role,
  /// For parents: the student this account is linked to.
  pub parent_of:      Option<Uuid>,
  /// School-issued identifier, distinct from `user_id`.
  pub student_number: Option<String>,
  #[serde(rename = "class")]
  pub class_name:     Option<String>,
  pub created_at:     DateTime<Utc>,
}

impl User {
  pub fn is_student(&self) -> bool { self.role == Role::Student }

  /// True if this user is a parent linked to `child_id`.
  pub fn is_parent_of(&self, child_id: Uuid) -> bool {
    self.role == Role::Parent && self.parent_of == Some(child_id)
  }

  /// Whether this user may read the records of `student_id`: the student
  /// themself, any teacher, or that student's parent.
  pub fn can_view_student(&self, student_id: Uuid) -> bool {
    match self.role {
      Role::Student => self.user_id == student_id,
      Role::Teacher => true,
      Role::Parent => self.parent_of == Some(student_id),
    }
  }

  pub fn summary(&self) -> UserSummary {
    UserSummary {
      user_id:        self.user_id,
      name:           self.name.clone(),
      email:          self.email.clone(),
      student_number: self.student_number.clone(),
      class_name:     self.class_name.clone(),
    }
  }
}

/// The public projection of a user embedded in reports and dashboards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
  pub user_id:        Uuid,
  pub name:           String,
  pub email:          String,
  pub student_number: Option<String>,
  #[serde(rename = "class")]
  pub class_name:     Option<String>,
}

/// Input to [`crate::store::RecordStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:           String,
  pub email:          String,
  pub role:           Role,
  pub parent_of:      Option<Uuid>,
  pub student_number: Option<String>,
  pub class_name:     Option<String>,
}

impl NewUser {
  pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
    Self {
      name: name.into(),
      email: email.into(),
      role,
      parent_of: None,
      student_number: None,
      class_name: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("name must not be empty"));
    }
    if !self.email.contains('@') {
      return Err(Error::validation(format!("invalid email: {:?}", self.email)));
    }
    match (self.role, self.parent_of) {
      (Role::Parent, None) => {
        Err(Error::validation("a parent account must name the student it is linked to"))
      }
      (Role::Student | Role::Teacher, Some(_)) => {
        Err(Error::validation("only parent accounts can be linked to a student"))
      }
      _ => Ok(()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(role: Role, parent_of: Option<Uuid>) -> User {
    User {
      user_id: Uuid::new_v4(),
      name: "Robin".into(),
      email: "robin@example.com".into(),
      role,
      parent_of,
      student_number: None,
      class_name: None,
      created_at: Utc::now(),
    }
  }

  #[test]
  fn role_parses_lowercase() {
    assert_eq!("teacher".parse::<Role>().unwrap(), Role::Teacher);
    assert_eq!(Role::Parent.to_string(), "parent");
    assert!("admin".parse::<Role>().is_err());
  }

  #[test]
  fn view_rules_follow_role() {
    let child = Uuid::new_v4();
    let other = Uuid::new_v4();

    let student = user(Role::Student, None);
    assert!(student.can_view_student(student.user_id));
    assert!(!student.can_view_student(other));

    assert!(user(Role::Teacher, None).can_view_student(other));

    let parent = user(Role::Parent, Some(child));
    assert!(parent.can_view_student(child));
    assert!(!parent.can_view_student(other));
    assert!(parent.is_parent_of(child));
  }

  #[test]
  fn new_parent_requires_link() {
    let input = NewUser::new("Sam", "sam@example.com", Role::Parent);
    assert!(matches!(input.validate(), Err(Error::Validation(_))));

    let mut input = NewUser::new("Sam", "sam@example.com", Role::Student);
    input.parent_of = Some(Uuid::new_v4());
    assert!(matches!(input.validate(), Err(Error::Validation(_))));
  }
}
