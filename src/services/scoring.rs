use crate::models::question::Question;
use crate::models::score::AnswerRecord;
use rust_decimal::Decimal;

/// Ceiling used when a quiz has no usable `max_marks`.
pub const DEFAULT_MAX_MARKS: i64 = 100;

pub struct ScoringService;

/// Result of normalizing a raw percentage against a quiz ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    /// Marks at full precision. Rounding happens only in display DTOs.
    pub marks: Decimal,
    /// Ceiling actually used, so callers can snapshot it on the score.
    pub ceiling: Decimal,
    /// True when `max_marks` was missing or non-positive and the default
    /// ceiling was substituted.
    pub misconfigured: bool,
}

impl ScoringService {
    /// Converts a raw percentage (0-100) into marks out of the quiz ceiling.
    ///
    /// `marks = percentage / 100 * ceiling`. A missing or non-positive
    /// ceiling never errors: the default of 100 is used instead and the
    /// result is flagged so the caller can mark the quiz misconfigured.
    /// Applying the formula twice with the same inputs yields the same
    /// output.
    pub fn normalize(percentage: Decimal, max_marks: Option<Decimal>) -> Normalized {
        let (ceiling, misconfigured) = match max_marks {
            Some(m) if m > Decimal::ZERO => (m, false),
            _ => (Decimal::from(DEFAULT_MAX_MARKS), true),
        };
        Normalized {
            marks: percentage / Decimal::from(100) * ceiling,
            ceiling,
            misconfigured,
        }
    }

    /// Rounds a stored full-precision value for presentation.
    pub fn display(value: Decimal) -> Decimal {
        value.round_dp(2)
    }

    /// Grades submitted answers against the quiz questions. Each answer
    /// earns the selected option's point value; the raw percentage is
    /// earned / max-possible * 100 (zero when the quiz has no scorable
    /// points).
    pub fn grade(questions: &[Question], answers: &[SubmittedAnswer]) -> GradeOutcome {
        let mut earned: i32 = 0;
        let mut possible: i32 = 0;
        let mut records: Vec<AnswerRecord> = Vec::with_capacity(questions.len());

        for (idx, q) in questions.iter().enumerate() {
            let question_id = q.id.max((idx as i32) + 1);
            let max_points = q.max_points();
            possible += max_points;

            let submitted = answers.iter().find(|a| a.question_id == question_id);
            let selected = submitted.and_then(|a| a.selected_option);
            let points_awarded = selected
                .and_then(|i| q.options.get(i as usize))
                .map(|o| o.points)
                .unwrap_or(0);
            earned += points_awarded;

            records.push(AnswerRecord {
                question_id,
                selected_option: selected,
                ranking: submitted.and_then(|a| a.ranking.clone()),
                reasoning: submitted.and_then(|a| a.reasoning.clone()),
                points_awarded: Decimal::from(points_awarded),
                instruction_score: None,
                max_points,
            });
        }

        let percentage = if possible > 0 {
            Decimal::from(earned) / Decimal::from(possible) * Decimal::from(100)
        } else {
            Decimal::ZERO
        };

        GradeOutcome {
            percentage,
            answers: records,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmittedAnswer {
    pub question_id: i32,
    pub selected_option: Option<i32>,
    pub ranking: Option<Vec<i32>>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GradeOutcome {
    pub percentage: Decimal,
    pub answers: Vec<AnswerRecord>,
}
