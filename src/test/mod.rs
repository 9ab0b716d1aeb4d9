mod mock_model;

mod archive;
mod lifecycle;
