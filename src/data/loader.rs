//! Game table ingestion
//!
//! Reads the provider's game log export and puts it in processing order.

use std::collections::HashSet;
use std::path::Path;

use crate::{GameRecord, HoopsError, Result};

/// Load games from CSV, sorted by (date, game id) with duplicate ids removed
pub fn load_games<P: AsRef<Path>>(path: P) -> Result<Vec<GameRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(HoopsError::MissingInput {
            artifact: "game table".to_string(),
            path: path.display().to_string(),
        });
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<GameRecord>() {
        match row {
            Ok(record) => records.push(record),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                log::debug!("Skipping unreadable game row: {}", e);
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        log::warn!("Skipped {} game rows with blank or malformed fields", skipped);
    }
    log::info!("Loaded {} games from {}", records.len(), path.display());
    Ok(sort_chronologically(records))
}

/// Order by date, ties by game id, keeping the first row per game id
pub fn sort_chronologically(mut records: Vec<GameRecord>) -> Vec<GameRecord> {
    records.sort_by(|a, b| (a.date, a.game_id).cmp(&(b.date, b.game_id)));

    let mut seen = HashSet::with_capacity(records.len());
    let before = records.len();
    records.retain(|r| seen.insert(r.game_id));

    if records.len() < before {
        log::warn!("Removed {} duplicate game rows", before - records.len());
    }
    records
}

/// Check that games are in (date, game id) order with unique ids
pub fn is_chronological(records: &[GameRecord]) -> bool {
    records
        .windows(2)
        .all(|w| (w[0].date, w[0].game_id) < (w[1].date, w[1].game_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameId, WinLoss};
    use chrono::NaiveDate;
    use std::io::Write;

    const HEADER: &str = "SEASON_ID,GAME_ID,GAME_DATE,TEAM_NAME_home,PTS_home,FGA_home,FTA_home,OREB_home,TOV_home,WL_home,TEAM_NAME_away,PTS_away,FGA_away,FTA_away,OREB_away,TOV_away,WL_away";

    #[test]
    fn test_missing_file() {
        let err = load_games("/definitely/not/here.csv").unwrap_err();
        match err {
            HoopsError::MissingInput { artifact, path } => {
                assert_eq!(artifact, "game table");
                assert!(path.contains("not/here.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_sorts_and_dedups() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "22023,0022300002,2023-10-25,Boston Celtics,108,86,20,9,12,W,New York Knicks,104,90,18,11,15,L").unwrap();
        writeln!(file, "22023,0022300001,2023-10-25,Denver Nuggets,119,91,17,10,11,W,Los Angeles Lakers,107,88,22,8,14,L").unwrap();
        writeln!(file, "22023,0022300000,2023-10-24,Phoenix Suns,102,84,21,9,13,L,Golden State Warriors,110,92,19,12,12,W").unwrap();
        writeln!(file, "22023,0022300001,2023-10-25,Denver Nuggets,119,91,17,10,11,W,Los Angeles Lakers,107,88,22,8,14,L").unwrap();
        file.flush().unwrap();

        let games = load_games(file.path()).unwrap();

        assert_eq!(games.len(), 3);
        let ids: Vec<_> = games.iter().map(|g| g.game_id).collect();
        assert_eq!(ids, vec![GameId(22300000), GameId(22300001), GameId(22300002)]);
        assert_eq!(games[0].date, NaiveDate::from_ymd_opt(2023, 10, 24).unwrap());
        assert_eq!(games[0].home_result, Some(WinLoss::Loss));
        assert_eq!(games[0].away_team, "Golden State Warriors");
        assert_eq!(games[2].home_fta, 20);
        assert!(is_chronological(&games));
    }

    #[test]
    fn test_load_skips_incomplete_rows() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "22023,0022300010,2023-11-01,Boston Celtics,108,86,20,9,12,W,New York Knicks,104,90,18,11,15,L").unwrap();
        writeln!(file, "22023,0022300011,2023-11-01,Denver Nuggets,119,91,,10,11,W,Los Angeles Lakers,107,88,22,8,14,L").unwrap();
        writeln!(file, "22023,0022300012,2023-11-02,Phoenix Suns,102,84,21,9,13,,Golden State Warriors,110,92,19,12,12,").unwrap();
        file.flush().unwrap();

        let games = load_games(file.path()).unwrap();

        let ids: Vec<_> = games.iter().map(|g| g.game_id).collect();
        assert_eq!(ids, vec![GameId(22300010), GameId(22300012)]);
        assert_eq!(games[0].home_result, Some(WinLoss::Win));
        assert_eq!(games[1].home_result, None);
        assert_eq!(games[1].away_result, None);
        assert_eq!(games[1].home_points, 102);
    }
}
