pub(crate) mod model_file;
