use std::path::{Path, PathBuf};

use trader_segments::config::PipelineConfig;

pub const HEADER: &str = "Account,Coin,Size USD,Side,Timestamp IST,Direction,Closed PnL,Trade ID";

/// One trade row in exchange-export layout.
#[allow(dead_code)]
pub fn row(account: &str, size: f64, ts: &str, direction: &str, pnl: f64, trade_id: u32) -> String {
    let side = if direction == "Buy" { "BUY" } else { "SELL" };
    format!("{account},BTC,{size},{side},{ts},{direction},{pnl},{trade_id}")
}

/// Write `rows` under `HEADER` to `dir/name` and return the path.
#[allow(dead_code)]
pub fn write_csv(dir: &Path, name: &str, header: &str, rows: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut body = String::from(header);
    body.push('\n');
    for r in rows {
        body.push_str(r);
        body.push('\n');
    }
    std::fs::write(&path, body).expect("Failed to write fixture");
    path
}

/// Config pointing every output into `dir`.
#[allow(dead_code)]
pub fn config_for(dir: &Path, trades: &Path, k: usize) -> PipelineConfig {
    PipelineConfig {
        trades_path: trades.to_path_buf(),
        output_path: dir.join("out/profiles.csv"),
        n_clusters: k,
        ..PipelineConfig::default()
    }
}

/// Eight accounts in three loose behavioral groups: small frequent winners,
/// large volatile sellers, and mid-size mixed traders.
#[allow(dead_code)]
pub fn sample_rows() -> Vec<String> {
    let mut rows = Vec::new();
    let mut id = 1;
    let mut push = |rows: &mut Vec<String>, account: &str, size: f64, ts: &str, dir: &str, pnl: f64| {
        rows.push(row(account, size, ts, dir, pnl, id));
        id += 1;
    };

    for account in ["0xsmall1", "0xsmall2", "0xsmall3"] {
        for (i, ts) in [
            "02-12-2024 09:00",
            "02-12-2024 10:30",
            "02-12-2024 15:45",
            "03-12-2024 11:00",
            "03-12-2024 12:10",
        ]
        .iter()
        .enumerate()
        {
            push(&mut rows, account, 50.0 + i as f64, ts, "Buy", 2.0 + i as f64);
        }
    }

    for account in ["0xwhale1", "0xwhale2"] {
        push(&mut rows, account, 25_000.0, "01-12-2024 22:50", "Sell", -4_000.0);
        push(&mut rows, account, 30_000.0, "05-12-2024 08:15", "Sell", 6_500.0);
        push(&mut rows, account, 28_000.0, "09-12-2024 13:40", "Open Short", -2_500.0);
    }

    for account in ["0xmid1", "0xmid2", "0xmid3"] {
        push(&mut rows, account, 900.0, "04-12-2024 10:00", "Buy", 40.0);
        push(&mut rows, account, 1_100.0, "04-12-2024 16:00", "Sell", -30.0);
        push(&mut rows, account, 1_000.0, "06-12-2024 10:00", "Buy", 0.0);
        push(&mut rows, account, 950.0, "07-12-2024 11:30", "Sell", 15.0);
    }

    rows
}
