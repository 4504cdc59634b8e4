//! Default data catalog used to seed empty tables on bootstrap.

use super::entities::{NewActivityType, NewProfessional, NewSchedule, NewTimeSlot, ProfessionalId};
use super::time::{ClockTime, Weekday};

/// Activity types as `(code, name, color)`.
pub const DEFAULT_ACTIVITY_TYPES: [(&str, &str, &str); 6] = [
    ("aula", "Aula", "#3b82f6"),
    ("reuniao", "Reunião", "#8b5cf6"),
    ("plantao", "Plantão", "#f59e0b"),
    ("estudo", "Estudo", "#10b981"),
    ("disponivel_horario", "Disponível", "#6b7280"),
    ("ausencia", "Ausência", "#ef4444"),
];

/// Seed professionals as `(name, initials)`.
pub const DEFAULT_PROFESSIONALS: [(&str, &str); 5] = [
    ("Prof. Paulo", "PP"),
    ("Profa. Ana Maria", "AM"),
    ("Prof. Carlos", "CL"),
    ("Prof. João", "JM"),
    ("Profa. Maria", "MM"),
];

/// Morning and afternoon windows covered by the base slots, as minutes since midnight.
const BASE_SLOT_WINDOWS: [(u16, u16); 2] = [(8 * 60, 12 * 60), (13 * 60, 17 * 60)];

/// A sample schedule whose professional is referenced by seed initials.
///
/// Ids are only known after professionals are inserted, so the bootstrap
/// resolves `initials` against the stored professionals before inserting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleSeed {
    pub initials: &'static str,
    pub weekday: Weekday,
    pub start_time: &'static str,
    pub end_time: &'static str,
    pub activity_code: &'static str,
    pub location: &'static str,
    pub notes: &'static str,
}

impl ScheduleSeed {
    /// Build the insertable record once the professional id is known.
    ///
    /// Empty location/notes are stored as NULL.
    pub fn to_new_schedule(&self, professional_id: ProfessionalId) -> Option<NewSchedule> {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Some(NewSchedule {
            professional_id,
            weekday: self.weekday,
            start_time: self.start_time.parse().ok()?,
            end_time: self.end_time.parse().ok()?,
            activity_code: self.activity_code.to_string(),
            location: non_empty(self.location),
            notes: non_empty(self.notes),
        })
    }
}

const fn seed(
    initials: &'static str,
    weekday: Weekday,
    start_time: &'static str,
    end_time: &'static str,
    activity_code: &'static str,
    location: &'static str,
    notes: &'static str,
) -> ScheduleSeed {
    ScheduleSeed {
        initials,
        weekday,
        start_time,
        end_time,
        activity_code,
        location,
        notes,
    }
}

pub const DEFAULT_SCHEDULES: [ScheduleSeed; 11] = [
    seed("PP", Weekday::Segunda, "08:00", "09:30", "aula", "Sala 101", "Matemática"),
    seed("AM", Weekday::Segunda, "08:00", "09:30", "aula", "Sala 203", "Português"),
    seed("CL", Weekday::Segunda, "08:00", "09:30", "disponivel_horario", "", ""),
    seed("JM", Weekday::Segunda, "08:00", "09:30", "estudo", "Biblioteca", "Preparação de aulas"),
    seed("MM", Weekday::Segunda, "08:00", "09:30", "plantao", "Sala Professores", "Plantão de dúvidas"),
    seed("PP", Weekday::Segunda, "09:45", "11:15", "reuniao", "Sala Reuniões", "Reunião pedagógica"),
    seed("AM", Weekday::Segunda, "09:45", "11:15", "aula", "Sala 203", "Português"),
    seed("CL", Weekday::Segunda, "09:45", "11:15", "reuniao", "Sala Reuniões", "Reunião pedagógica"),
    seed("JM", Weekday::Segunda, "09:45", "11:15", "aula", "Lab Química", "Química"),
    seed("PP", Weekday::Terca, "08:00", "09:30", "aula", "Sala 102", "Matemática"),
    seed("AM", Weekday::Terca, "08:00", "09:30", "reuniao", "Sala Coordenação", "Reunião de departamento"),
];

pub fn default_activity_types() -> Vec<NewActivityType> {
    DEFAULT_ACTIVITY_TYPES
        .iter()
        .map(|(code, name, color)| NewActivityType::new(*code, *name, *color))
        .collect()
}

pub fn default_professionals() -> Vec<NewProfessional> {
    DEFAULT_PROFESSIONALS
        .iter()
        .map(|(name, initials)| NewProfessional::new(*name, *initials))
        .collect()
}

/// Sixteen half-hour base slots: 08:00–12:00 and 13:00–17:00.
pub fn default_time_slots() -> Vec<NewTimeSlot> {
    let step = super::entities::DEFAULT_SLOT_INTERVAL as u16;
    BASE_SLOT_WINDOWS
        .iter()
        .flat_map(|&(open, close)| (open..close).step_by(step as usize))
        .filter_map(|start| {
            let start_time = ClockTime::from_minutes(start)?;
            let end_time = start_time.checked_add_minutes(step)?;
            Some(NewTimeSlot::base(start_time, end_time))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_time_slots_cover_both_windows() {
        let slots = default_time_slots();
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].start_time.to_string(), "08:00");
        assert_eq!(slots[7].end_time.to_string(), "12:00");
        assert_eq!(slots[8].start_time.to_string(), "13:00");
        assert_eq!(slots[15].end_time.to_string(), "17:00");
        assert!(slots.iter().all(|s| s.interval == 30 && s.is_base_slot));
        assert!(slots.iter().all(|s| s.start_time < s.end_time));
    }

    #[test]
    fn test_activity_codes_are_unique() {
        let codes: HashSet<_> = DEFAULT_ACTIVITY_TYPES.iter().map(|(c, _, _)| *c).collect();
        assert_eq!(codes.len(), DEFAULT_ACTIVITY_TYPES.len());
    }

    #[test]
    fn test_schedule_seeds_reference_known_data() {
        let initials: HashSet<_> = DEFAULT_PROFESSIONALS.iter().map(|(_, i)| *i).collect();
        let codes: HashSet<_> = DEFAULT_ACTIVITY_TYPES.iter().map(|(c, _, _)| *c).collect();
        for s in DEFAULT_SCHEDULES.iter() {
            assert!(initials.contains(s.initials), "unknown initials {}", s.initials);
            assert!(codes.contains(s.activity_code), "unknown code {}", s.activity_code);
            assert!(s.to_new_schedule(ProfessionalId(1)).is_some());
        }
    }

    #[test]
    fn test_empty_seed_fields_become_null() {
        let available = DEFAULT_SCHEDULES[2].to_new_schedule(ProfessionalId(3)).unwrap();
        assert_eq!(available.location, None);
        assert_eq!(available.notes, None);
        assert_eq!(available.professional_id, ProfessionalId(3));
    }
}
