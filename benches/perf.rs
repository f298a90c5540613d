use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use ats_trends::extract::extract_rows_from_html;
use ats_trends::row::{NormalizedRow, TrendRow, fingerprint};
use ats_trends::store::{ConflictPolicy, Store};
use chrono::Utc;

const TEAMS: usize = 362;

fn sample_page() -> String {
    let mut html = String::from(
        "<html><body><table><thead><tr>\
         <th>Team</th><th>ATS Record</th><th>Cover %</th><th>MOV</th><th>ATS +/-</th>\
         </tr></thead><tbody>",
    );
    for i in 0..TEAMS {
        html.push_str(&format!(
            "<tr><td><a href=\"/ncb/team/{i}\">Team {i}</a></td>\
             <td>{}-{}-0</td><td>{:.1}%</td><td>{:.1}</td><td>+{:.1}</td></tr>",
            i % 20,
            (i * 7) % 20,
            (i % 100) as f64,
            (i % 30) as f64 - 15.0,
            (i % 9) as f64
        ));
    }
    html.push_str("</tbody></table></body></html>");
    html
}

fn sample_row() -> TrendRow {
    [
        ("Team", "LA Lakers"),
        ("ATS Record", "10-5-1"),
        ("Cover %", "66.7%"),
        ("MOV", "3.2"),
        ("ATS +/-", "+1.4"),
    ]
    .into_iter()
    .collect()
}

fn bench_extract_rows(c: &mut Criterion) {
    let page = sample_page();
    c.bench_function("extract_rows", |b| {
        b.iter(|| {
            let rows = extract_rows_from_html(black_box(&page)).unwrap();
            black_box(rows.len());
        })
    });
}

fn bench_fingerprint(c: &mut Criterion) {
    let row = sample_row();
    c.bench_function("fingerprint", |b| {
        b.iter(|| black_box(fingerprint(black_box(&row))))
    });
}

fn bench_upsert_league(c: &mut Criterion) {
    let rows = extract_rows_from_html(&sample_page())
        .unwrap()
        .into_iter()
        .map(NormalizedRow::from_row)
        .collect::<Vec<_>>();
    let mut store = Store::open_in_memory().unwrap();
    {
        let session = store.session().unwrap();
        session.ensure_schema().unwrap();
        session.commit().unwrap();
    }

    c.bench_function("upsert_league_overwrite_by_day", |b| {
        b.iter(|| {
            let session = store.session().unwrap();
            let now = Utc::now();
            let run_id = session.record_run("bench", "ncb", "bench://ncb", now).unwrap();
            let n = session
                .upsert_snapshots(ConflictPolicy::OverwriteByDay, run_id, "ncb", now, &rows)
                .unwrap();
            session.commit().unwrap();
            black_box(n);
        })
    });
}

criterion_group!(
    perf,
    bench_extract_rows,
    bench_fingerprint,
    bench_upsert_league
);
criterion_main!(perf);
