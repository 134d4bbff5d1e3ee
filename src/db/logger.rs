use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, Naming};

pub fn init_logger() {
    Logger::try_with_env_or_str("info")
        .expect("invalid log spec")
        .log_to_file(FileSpec::default().directory("logs"))
        .duplicate_to_stderr(Duplicate::Warn)
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Numbers,
            Cleanup::KeepLogFiles(7),
        )
        .start()
        .expect("failed to start logger");
}
