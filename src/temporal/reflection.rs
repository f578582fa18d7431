use super::model::GapClass;

fn templates_for(gap: GapClass) -> &'static [&'static str] {
    match gap {
        GapClass::SameSession => &[],
        GapClass::SameDay => &[
            "You spoke with this person earlier today.",
            "This continues a conversation from earlier today.",
        ],
        GapClass::FewDays => &[
            "A few days have passed since you last spoke with this person.",
            "It has been several days since your last exchange.",
        ],
        GapClass::Weeks => &[
            "Weeks have passed since you last spoke with this person.",
            "It has been some weeks; the thread between you has gone quiet.",
        ],
        GapClass::LongAbsence => &[
            "A long silence has passed since you last spoke with this person.",
            "It has been a long time — long enough that much may have changed.",
        ],
    }
}

/// Build the temporal reflection line for a gap class, optionally
/// anchored to the remembered `last_topic` (§3).
pub fn reflection_for(gap: GapClass, last_topic: Option<&str>, seed: u64) -> Option<String> {
    let templates = templates_for(gap);
    if templates.is_empty() {
        return None;
    }

    let base = templates[(seed as usize) % templates.len()];

    Some(match last_topic {
        Some(topic) if !topic.trim().is_empty() => {
            format!("{base} Last time, the conversation touched on {topic}.")
        }
        _ => base.to_string(),
    })
}
