//! End-to-end runs of the anonymisation over temporary folders.

use anonmark_core::{Error, ReconcileConfig, Reconciler, RunSummary};
use chrono::{Local, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    input: PathBuf,
    output: PathBuf,
    roster: PathBuf,
}

impl Fixture {
    fn new(roster: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("in");
        let output = dir.path().join("out");
        fs::create_dir(&input).unwrap();
        fs::create_dir(&output).unwrap();
        let roster_path = dir.path().join("students.tsv");
        fs::write(&roster_path, roster).unwrap();
        Self {
            _dir: dir,
            input,
            output,
            roster: roster_path,
        }
    }

    fn submission(&self, folder: &str, files: &[&str]) -> PathBuf {
        let path = self.input.join(folder);
        fs::create_dir_all(&path).unwrap();
        for file in files {
            fs::write(path.join(file), format!("contents of {}", file)).unwrap();
        }
        path
    }

    fn config(&self) -> ReconcileConfig {
        ReconcileConfig {
            input_dir: Some(self.input.clone()),
            output_dir: Some(self.output.clone()),
            roster_path: Some(self.roster.clone()),
            quiet: true,
        }
    }

    fn run(&self) -> Result<RunSummary, Error> {
        Reconciler::new(self.config()).run_at(started())
    }

    fn log_lines(&self) -> Vec<String> {
        fs::read_to_string(self.output.join("logfile_20240115-10:30:00.txt"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn outputs(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with("logfile_"))
            .collect();
        names.sort();
        names
    }
}

fn started() -> chrono::DateTime<Local> {
    Local.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
}

fn file_in(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

#[test]
fn copies_export_folder_to_anonymous_name() {
    let fx = Fixture::new("FirstName\tLastName\tAnon\nBilal\tAhmed\t30192844\n");
    let folder = fx.submission(
        "B.Ahmed_30192844_assignsubmission_file",
        &["B.Ahmed_30192844_assignsubmission_file_7859K.docx"],
    );

    let summary = fx.run().unwrap();

    assert_eq!(summary.folders_scanned, 1);
    assert_eq!(summary.copied.len(), 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.warnings, 1);
    assert_eq!(fx.outputs(), vec!["30192844.docx"]);
    assert_eq!(
        fs::read_to_string(fx.output.join("30192844.docx")).unwrap(),
        "contents of B.Ahmed_30192844_assignsubmission_file_7859K.docx"
    );
    let source = file_in(&folder, "B.Ahmed_30192844_assignsubmission_file_7859K.docx");
    assert_eq!(summary.copied[0].source, source);
    assert_eq!(
        fx.log_lines(),
        vec![format!(
            "{}\tID 7859K not found for Ahmed in student list, using folder ID 30192844\tWARN 2",
            source.display()
        )]
    );
}

#[test]
fn matching_filename_id_needs_no_fallback() {
    let fx = Fixture::new("LastName\tAnon\nAhmed\t30192844\n");
    fx.submission(
        "B.Ahmed_30192844_assignsubmission_file",
        &["B.Ahmed_30192844_assignsubmission_file_30192844.docx"],
    );

    let summary = fx.run().unwrap();

    assert_eq!(summary.warnings, 0);
    assert_eq!(fx.outputs(), vec!["30192844.docx"]);
    assert!(fx.log_lines().is_empty());
}

#[test]
fn folder_id_used_for_unknown_token_is_logged() {
    let fx = Fixture::new("FirstName\tLastName\tAnon\nAnn\tSmith\t111\nBob\tSmith\t222\n");
    let folder = fx.submission(
        "B.Smith_111_assignsubmission_file",
        &["B.Smith_111_assignsubmission_file_999.docx"],
    );

    let summary = fx.run().unwrap();

    let file = folder.join("B.Smith_111_assignsubmission_file_999.docx");
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.warnings, 2);
    assert_eq!(fx.outputs(), vec!["111.docx"]);
    assert_eq!(
        fx.log_lines(),
        vec![
            format!(
                "{}\tID 999 not found for Smith in student list, using folder ID 111\tWARN 2",
                file.display()
            ),
            format!(
                "{}\tStudent name Smith has more than one entry, using 111\tWARN 1",
                file.display()
            ),
        ]
    );
}

#[test]
fn copy_overwrites_existing_output() {
    let fx = Fixture::new("LastName\tAnon\nLee\t42\n");
    fx.submission("Lee_assignsubmission_file", &["Lee_assignsubmission_file_42.pdf"]);
    fs::write(fx.output.join("42.pdf"), "stale").unwrap();

    fx.run().unwrap();

    assert_eq!(
        fs::read_to_string(fx.output.join("42.pdf")).unwrap(),
        "contents of Lee_assignsubmission_file_42.pdf"
    );
}

#[test]
fn folder_without_matching_file_is_error_6() {
    let fx = Fixture::new("LastName\tAnon\nAhmed\t1\n");
    let folder = fx.submission("Ahmed_1_assignsubmission_file", &["essay.docx"]);

    let summary = fx.run().unwrap();

    assert_eq!(summary.errors, 1);
    assert!(summary.copied.is_empty());
    assert!(fx.outputs().is_empty());
    assert_eq!(
        fx.log_lines(),
        vec![format!(
            "{}\tNot processed - No matching files found\tERROR 6",
            folder.display()
        )]
    );
}

#[test]
fn folder_with_two_matching_files_is_error_7() {
    let fx = Fixture::new("LastName\tAnon\nAhmed\t1\n");
    let folder = fx.submission(
        "Ahmed_1_assignsubmission_file",
        &[
            "Ahmed_1_assignsubmission_file_1.docx",
            "Ahmed_1_assignsubmission_file_1.pdf",
        ],
    );

    let summary = fx.run().unwrap();

    assert_eq!(summary.errors, 1);
    assert!(fx.outputs().is_empty());
    assert_eq!(
        fx.log_lines(),
        vec![format!(
            "{}\tNot processed - Too many matching files found\tERROR 7",
            folder.display()
        )]
    );
}

#[test]
fn stray_file_in_input_is_error_5() {
    let fx = Fixture::new("LastName\tAnon\nAhmed\t1\n");
    fs::write(fx.input.join("readme.txt"), "x").unwrap();

    let summary = fx.run().unwrap();

    assert_eq!(summary.folders_scanned, 0);
    assert_eq!(
        fx.log_lines(),
        vec![format!(
            "{}\tNot processed - Not a directory\tERROR 5",
            fx.input.join("readme.txt").display()
        )]
    );
}

#[test]
fn unknown_surname_is_error_8() {
    let fx = Fixture::new("LastName\tAnon\nAhmed\t1\n");
    let folder = fx.submission("Doe_9_assignsubmission_file", &["Doe_9_assignsubmission_file_9.docx"]);

    let summary = fx.run().unwrap();

    assert_eq!(summary.errors, 1);
    assert!(fx.outputs().is_empty());
    assert_eq!(
        fx.log_lines(),
        vec![format!(
            "{}\tNot processed - last name Doe not found in student list\tERROR 8",
            folder.join("Doe_9_assignsubmission_file_9.docx").display()
        )]
    );
}

#[test]
fn shared_surname_warns_and_mismatch_is_error_9() {
    let fx = Fixture::new("FirstName\tLastName\tAnon\nAnn\tSmith\t111\nBob\tSmith\t222\n");
    let good = fx.submission(
        "A.Smith_assignsubmission_file",
        &["A.Smith_assignsubmission_file_111.docx"],
    );
    let bad = fx.submission(
        "B.Smith_assignsubmission_file",
        &["B.Smith_assignsubmission_file_999.docx"],
    );

    let summary = fx.run().unwrap();

    assert_eq!(summary.folders_scanned, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.warnings, 1);
    assert_eq!(fx.outputs(), vec!["111.docx"]);
    assert_eq!(
        fx.log_lines(),
        vec![
            format!(
                "{}\tStudent name Smith has more than one entry, using 111\tWARN 1",
                good.join("A.Smith_assignsubmission_file_111.docx").display()
            ),
            format!(
                "{}\tNot processed - ID 999 doesn't match ID 111,222 found in student list\tERROR 9",
                bad.join("B.Smith_assignsubmission_file_999.docx").display()
            ),
        ]
    );
}

#[test]
fn cyrillic_surnames_stay_distinct() {
    let fx = Fixture::new("LastName\tAnon\nИванов\t1\nПетров\t2\n");
    let folder = fx.submission(
        "Петров_x_assignsubmission_file",
        &["Петров_x_assignsubmission_file_1.docx"],
    );

    let summary = fx.run().unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(summary.warnings, 0);
    assert!(fx.outputs().is_empty());
    assert_eq!(
        fx.log_lines(),
        vec![format!(
            "{}\tNot processed - ID 1 doesn't match ID 2 found in student list\tERROR 9",
            folder.join("Петров_x_assignsubmission_file_1.docx").display()
        )]
    );
}

#[test]
fn errors_do_not_stop_later_folders() {
    let fx = Fixture::new("LastName\tAnon\nAhmed\t1\nLee\t2\n");
    fx.submission("Ahmed_1_assignsubmission_file", &[]);
    fx.submission("Lee_2_assignsubmission_file", &["Lee_2_assignsubmission_file_2.txt"]);

    let summary = fx.run().unwrap();

    assert_eq!(summary.errors, 1);
    assert_eq!(fx.outputs(), vec!["2.txt"]);
}

#[test]
fn failed_copy_is_error_10_and_run_continues() {
    let fx = Fixture::new("LastName\tAnon\nAhmed\t1\nLee\t2\n");
    // The only matching entry is a directory, which cannot be copied
    let ahmed = fx.submission("Ahmed_1_assignsubmission_file", &[]);
    let nested = ahmed.join("Ahmed_1_assignsubmission_file_1");
    fs::create_dir(&nested).unwrap();
    fx.submission("Lee_2_assignsubmission_file", &["Lee_2_assignsubmission_file_2.txt"]);

    let summary = fx.run().unwrap();

    assert_eq!(summary.folders_scanned, 2);
    assert_eq!(summary.errors, 1);
    assert_eq!(fx.outputs(), vec!["2.txt"]);
    let lines = fx.log_lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with(&format!("{}\tNot processed - Cannot copy to ", nested.display())));
    assert!(lines[0].ends_with("\tERROR 10"));
}

#[test]
fn duplicate_ids_abort_before_scanning() {
    let fx = Fixture::new("FirstName\tLastName\tAnon\nA\tAhmed\t1\nB\tLee\t1\n");
    fx.submission("Ahmed_1_assignsubmission_file", &["Ahmed_1_assignsubmission_file_1.docx"]);

    let err = fx.run().unwrap_err();

    assert_eq!(err.issue_code(), Some(4));
    assert!(fx.outputs().is_empty());
    assert_eq!(
        fx.log_lines(),
        vec!["ERROR - Non-unique student IDs in student table: 1\tERROR 4"]
    );
}

#[test]
fn missing_output_folder_is_error_1_without_log() {
    let fx = Fixture::new("LastName\tAnon\n");
    let mut config = fx.config();
    config.output_dir = Some(fx.output.join("does-not-exist"));

    let err = Reconciler::new(config).run_at(started()).unwrap_err();

    assert_eq!(err.issue_code(), Some(1));
    assert!(fs::read_dir(&fx.output).unwrap().next().is_none());
}

#[test]
fn missing_input_folder_is_error_2() {
    let fx = Fixture::new("LastName\tAnon\n");
    let mut config = fx.config();
    config.input_dir = None;

    let err = Reconciler::new(config).run_at(started()).unwrap_err();

    assert_eq!(err.issue_code(), Some(2));
    assert_eq!(
        fx.log_lines(),
        vec!["ERROR - Input folder must be specified\tERROR 2"]
    );
}

#[test]
fn missing_roster_is_error_3() {
    let fx = Fixture::new("LastName\tAnon\n");
    let mut config = fx.config();
    config.roster_path = Some(fx.input.join("missing.tsv"));

    let err = Reconciler::new(config).run_at(started()).unwrap_err();

    assert_eq!(err.issue_code(), Some(3));
    assert_eq!(
        fx.log_lines(),
        vec!["ERROR - Student list must be specified\tERROR 3"]
    );
}

#[test]
fn roster_without_required_columns_fails() {
    let fx = Fixture::new("Name\tID\nAhmed\t1\n");

    let err = fx.run().unwrap_err();

    assert!(matches!(err, Error::RosterFormat(_)));
    assert_eq!(
        fx.log_lines(),
        vec!["ERROR - Invalid student table: missing column 'LastName'"]
    );
}
