use super::{
    RecordError,
    RecordFormat,
    RecordReader,
};
use crate::errors::DataReadingError;
use crate::models::{
    SampleRun,
    Spectrum,
};
use std::path::{
    Path,
    PathBuf,
};
use tracing::debug;

/// Loads every spectrum of one sample file into memory.
///
/// The sample name is the file name with all extensions stripped.
pub fn read_sample(path: &Path) -> Result<SampleRun, DataReadingError> {
    let format =
        RecordFormat::detect_from_path(path).map_err(|e| DataReadingError::FileReadingError {
            source: e,
            context: "Error opening spectrum file for format detection",
            path: PathBuf::from(path),
        })?;
    let file = std::fs::File::open(path).map_err(|e| DataReadingError::FileReadingError {
        source: e,
        context: "Error opening spectrum file",
        path: PathBuf::from(path),
    })?;

    let to_read_err = |e: RecordError| match e {
        RecordError::Io(source) => DataReadingError::FileReadingError {
            source,
            context: "Error reading spectrum file",
            path: PathBuf::from(path),
        },
        RecordError::Parse(source) => DataReadingError::ParsingError {
            source,
            context: "Error parsing spectrum record",
            path: PathBuf::from(path),
        },
    };

    let st = std::time::Instant::now();
    let spectra: Vec<Spectrum> = RecordReader::new(file, format)
        .map_err(to_read_err)?
        .map(|x| x.map_err(to_read_err))
        .collect::<Result<_, _>>()?;
    debug!("Decoded {} spectra in {:?}", spectra.len(), st.elapsed());

    SampleRun::new(sample_name(path), spectra)
}

fn sample_name(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|x| x.to_string_lossy().to_string())
        .unwrap_or_default();
    match file_name.split_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serde::write_records;

    #[test]
    fn test_sample_name_strips_all_extensions() {
        assert_eq!(sample_name(Path::new("/a/b/run_01.ndjson.zst")), "run_01");
        assert_eq!(sample_name(Path::new("run_02")), "run_02");
    }

    #[test]
    fn test_read_sample_keeps_ms2_out_of_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.ndjson.zst");
        let spectra: Vec<Spectrum> = (0..4)
            .map(|i| Spectrum {
                id: i,
                rt_minutes: i as f64 * 0.01,
                ms_level: if i % 2 == 0 { 1 } else { 2 },
                mz: vec![100.0, 101.0],
                intensity: vec![10.0, 20.0],
            })
            .collect();
        write_records(&spectra, &path, RecordFormat::NdJsonZstd).unwrap();
        let run = read_sample(&path).unwrap();
        assert_eq!(run.name(), "s1");
        assert_eq!(run.num_spectra(), 4);
        assert_eq!(run.num_ms1(), 2);
    }

    #[test]
    fn test_unreadable_source_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ndjson");
        std::fs::write(&path, "{\"id\": 1}\n").unwrap();
        assert!(matches!(
            read_sample(&path),
            Err(DataReadingError::ParsingError { .. })
        ));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn test_reader_leaves_load_summary_to_caller() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1.ndjson");
        let spectra = vec![Spectrum {
            id: 0,
            rt_minutes: 0.0,
            ms_level: 1,
            mz: vec![100.0],
            intensity: vec![10.0],
        }];
        write_records(&spectra, &path, RecordFormat::NdJson).unwrap();

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || read_sample(&path).unwrap());

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("Decoded 1 spectra"), "{}", text);
        assert!(!text.contains("INFO"), "{}", text);
    }
}
