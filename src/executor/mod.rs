pub mod dispatcher;
pub mod text_input;
pub mod validator;
