use std::fmt::Write;

use coursebin_client::RefreshReport;
use coursebin_core::{
    AppViewModel, ComponentRow, CourseRow, JobView, Notice, NoticeLevel, ScheduledSection,
};

pub fn render_bin(view: &AppViewModel) -> String {
    if view.courses.is_empty() {
        return "The coursebin is empty.\n".to_string();
    }
    let mut out = String::new();
    for course in &view.courses {
        render_course(&mut out, course);
    }
    out
}

fn render_course(out: &mut String, course: &CourseRow) {
    if course.loading {
        let _ = writeln!(out, "[ ] {} (loading...)", course.course);
        return;
    }
    let group = course
        .group
        .map_or_else(|| " ".to_string(), |group| group.to_string());
    let updated = course
        .updated
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string());
    let _ = writeln!(
        out,
        "[{group}] {}{} {}  {}/{} sections  updated {updated}",
        course.course,
        flags(course.exclude, course.exempt),
        course.term.as_deref().unwrap_or("?"),
        course.active_sections,
        course.total_sections,
    );
    for component in &course.components {
        render_component(out, component);
    }
}

fn render_component(out: &mut String, component: &ComponentRow) {
    let _ = writeln!(
        out,
        "    {}.{}  {}/{}",
        component.part,
        component.name,
        component.active,
        component.sections.len()
    );
    for section in &component.sections {
        let detail = section
            .data
            .as_ref()
            .map(|data| {
                [
                    data.days.as_deref(),
                    data.start.as_deref(),
                    data.end.as_deref(),
                    data.instructor.as_deref(),
                ]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ")
            })
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "        {}{}  {detail}",
            section.section_id,
            flags(section.exclude, section.exempt)
        );
    }
}

fn flags(exclude: bool, exempt: bool) -> &'static str {
    match (exclude, exempt) {
        (false, false) => "",
        (true, false) => " (excluded)",
        (false, true) => " (exempt)",
        (true, true) => " (excluded, exempt)",
    }
}

pub fn render_job(job: &JobView) -> String {
    let mut line = format!("{} [{}] {}", job.name, job.id, job.status);
    if let Some(count) = job.schedule_count {
        let _ = write!(line, ", {count} schedules");
    }
    if job.timed_out {
        line.push_str(", still pending");
    }
    line
}

pub fn render_notice(notice: &Notice) -> String {
    let label = match notice.level {
        NoticeLevel::Info => "info",
        NoticeLevel::Warning => "warning",
        NoticeLevel::Error => "error",
    };
    format!("{label}: {}", notice.text)
}

pub fn render_refresh(sections: &[ScheduledSection], report: &RefreshReport) -> String {
    let mut out = String::new();
    for key in &report.refreshed {
        let _ = writeln!(out, "refreshed {key}");
    }
    for (key, err) in &report.failed {
        let _ = writeln!(out, "failed {key}: {err}");
    }
    for key in &report.skipped {
        let _ = writeln!(out, "skipped {key} (already refreshing)");
    }
    let _ = writeln!(
        out,
        "{} of {} sections updated",
        report.merged,
        sections.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use coursebin_core::{update, AppState, CourseData, Msg, NodeId, SectionData};

    fn view() -> AppViewModel {
        let mut lecture = SectionData::new("29911", "Lecture");
        lecture.days = Some("13".to_string());
        lecture.start = Some("10:00".to_string());
        lecture.end = Some("11:50".to_string());
        let (state, _) = update(
            AppState::new(),
            Msg::AddCourseRequested {
                term: "20201".to_string(),
                course: "csci-201".to_string(),
            },
        );
        let (state, _) = update(
            state,
            Msg::CourseFetched {
                course: "csci-201".to_string(),
                result: Ok(CourseData {
                    name: "csci-201".to_string(),
                    term: "20201".to_string(),
                    updated: "2020-01-10T12:00:00Z".parse().ok(),
                    sections: vec![lecture],
                }),
            },
        );
        let (state, _) = update(
            state,
            Msg::ToggleExclude(NodeId::new("csci-201.0.Lecture.29911")),
        );
        let (state, _) = update(
            state,
            Msg::AddCourseRequested {
                term: "20201".to_string(),
                course: "math-225".to_string(),
            },
        );
        state.view()
    }

    #[test]
    fn bin_lists_courses_sections_and_placeholders() {
        let text = render_bin(&view());
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[1] csci-201 20201  0/1 sections  updated 2020-01-10 12:00",
                "    0.Lecture  0/1",
                "        29911 (excluded)  13 10:00 11:50",
                "[ ] math-225 (loading...)",
            ]
        );
    }

    #[test]
    fn empty_bin_says_so() {
        assert_eq!(render_bin(&AppViewModel::default()), "The coursebin is empty.\n");
    }
}
