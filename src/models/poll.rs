use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

// poll row joined with its owner and vote tally
#[derive(Debug, Serialize, FromRow)]
pub struct Poll {
    pub id: i64,
    pub owner_id: i64,
    pub owner: String,
    pub text: String,
    pub pub_date: NaiveDate,
    pub num_votes: i64,
}

#[derive(Debug, FromRow)]
pub struct ChoiceCount {
    pub id: i64,
    pub choice_text: String,
    pub num_votes: i64,
}

#[derive(Debug, Serialize)]
pub struct ChoiceResult {
    pub id: i64,
    pub text: String,
    pub num_votes: i64,
    pub percentage: f64,
}

// vote share per choice, zero across the board when nobody voted yet
pub fn results(counts: &[ChoiceCount]) -> Vec<ChoiceResult> {
    let total: i64 = counts.iter().map(|c| c.num_votes).sum();
    counts
        .iter()
        .map(|c| ChoiceResult {
            id: c.id,
            text: c.choice_text.clone(),
            num_votes: c.num_votes,
            percentage: if total == 0 {
                0.0
            } else {
                c.num_votes as f64 / total as f64 * 100.0
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(id: i64, text: &str, num_votes: i64) -> ChoiceCount {
        ChoiceCount {
            id,
            choice_text: text.into(),
            num_votes,
        }
    }

    #[test]
    fn three_to_one_split_is_seventy_five_and_twenty_five() {
        let results = results(&[count(1, "red", 3), count(2, "blue", 1)]);
        assert_eq!(results[0].percentage, 75.0);
        assert_eq!(results[1].percentage, 25.0);
        assert_eq!(results[0].text, "red");
        assert_eq!(results[0].num_votes, 3);
    }

    #[test]
    fn no_votes_yields_zero_percent_for_every_choice() {
        let results = results(&[count(1, "red", 0), count(2, "blue", 0)]);
        assert!(results.iter().all(|r| r.percentage == 0.0));
        assert!(results.iter().all(|r| r.num_votes == 0));
    }

    #[test]
    fn shares_of_an_uneven_split_sum_to_one_hundred() {
        let results = results(&[count(1, "a", 1), count(2, "b", 1), count(3, "c", 1)]);
        let sum: f64 = results.iter().map(|r| r.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }
}
