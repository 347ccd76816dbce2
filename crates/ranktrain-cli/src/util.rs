use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write as _},
    path::Path,
};

use anyhow::Context as _;

use crate::schema::model_file::ModelFile;

/// Destination of a command's result: a file, or stdout when no path is given.
pub(crate) struct Output {
    writer: Box<dyn io::Write>,
    name: String,
}

impl Output {
    pub(crate) fn create(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self {
                writer: Box::new(io::stdout().lock()),
                name: "stdout".to_owned(),
            });
        };
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {}", path.display()))?;
        Ok(Self {
            writer: Box::new(BufWriter::new(file)),
            name: path.display().to_string(),
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Writes `model_file` as pretty-printed JSON and flushes.
    pub(crate) fn write_model(mut self, model_file: &ModelFile) -> anyhow::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, model_file)
            .with_context(|| format!("Failed to write model to {}", self.name))?;
        writeln!(self.writer).with_context(|| format!("Failed to write to {}", self.name))?;
        self.finish()
    }

    pub(crate) fn finish(mut self) -> anyhow::Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush output to {}", self.name))
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Reads a model file written by one of the training commands.
pub(crate) fn read_model_file(path: &Path) -> anyhow::Result<ModelFile> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open model file: {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse model file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use std::{env, fs, process};

    use ranktrain_evaluator::{ModelKind, TreeEnsemble};
    use ranktrain_training::random_forest::RandomForestParams;

    use super::*;
    use crate::schema::model_file::TrainerParams;

    #[test]
    fn test_model_file_on_disk() {
        let path = env::temp_dir().join(format!("ranktrain-model-{}.json", process::id()));
        let model_file = ModelFile {
            name: "random_forest".to_owned(),
            metric: "NDCG@10".to_owned(),
            params: TrainerParams::RandomForest(RandomForestParams::default()),
            train_metric: 0.5,
            test_metric: Some(0.25),
            model: ModelKind::Forest(TreeEnsemble::default()),
        };
        let output = Output::create(Some(path.as_path())).unwrap();
        assert_eq!(output.name(), path.display().to_string());
        output.write_model(&model_file).unwrap();

        let back = read_model_file(&path).unwrap();
        assert_eq!(back.model, model_file.model);
        assert_eq!(back.test_metric, Some(0.25));

        fs::write(&path, "{\"name\": ").unwrap();
        let err = read_model_file(&path).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse model file"));
        fs::remove_file(&path).unwrap();
    }
}
