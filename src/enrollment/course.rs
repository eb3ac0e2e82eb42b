//! Recovering the selected course when navigation state lost it.

use tracing::{debug, warn};

use super::model::CourseSelection;
use crate::session::Session;

/// The course arriving with navigation, or the durable `selectedCourse` copy.
///
/// A course that arrived via navigation is written back as the durable copy
/// so a later reload can recover it.
pub async fn resolve_course(
    session: &Session,
    inbound: Option<&CourseSelection>,
) -> Option<CourseSelection> {
    if let Some(course) = inbound {
        if let Err(e) = session.set_selected_course(course).await {
            warn!("Failed to persist selected course: {}", e);
        }
        return Some(course.clone());
    }

    let stored = session.selected_course().await;
    match &stored {
        Some(course) => debug!(
            course = course.title.as_deref().unwrap_or("<untitled>"),
            "Recovered course from storage"
        ),
        None => debug!("No course in navigation state or storage"),
    }
    stored
}
