use std::ffi::{OsStr, OsString};

use functrace::{
  extract, on_function_entry, on_function_return, ErrorSlot, FrameInspect,
  FUNCTION_ENTRY, FUNCTION_RETURN,
};

struct DemoFrame<'a> {
  errors: &'a ErrorSlot,
  filename: OsString,
  funcname: OsString,
  line: i32,
}

impl<'a> DemoFrame<'a> {
  fn new(errors: &'a ErrorSlot, filename: &str, funcname: &str, line: i32) -> Self {
    Self {
      errors,
      filename: filename.into(),
      funcname: funcname.into(),
      line,
    }
  }
}

impl FrameInspect for DemoFrame<'_> {
  fn error_slot(&self) -> &ErrorSlot {
    self.errors
  }

  fn function_name(&self) -> &OsStr {
    &self.funcname
  }

  fn last_instruction(&self) -> i32 {
    self.line * 2
  }

  fn line_for_instruction(&self, instruction: i32) -> Option<i32> {
    Some(instruction / 2)
  }

  fn source_file(&self) -> &OsStr {
    &self.filename
  }

  fn token(&self) -> usize {
    self as *const Self as usize
  }
}

fn show(direction: &str, frame: &DemoFrame<'_>, depth: usize) {
  let fmi = extract(frame);
  println!(
    "{:indent$}{direction} {} in {}:{}",
    "",
    fmi
      .funcname()
      .map_or("<unavailable>", |n| n.to_str().unwrap_or("?")),
    fmi
      .filename()
      .map_or("<unavailable>", |n| n.to_str().unwrap_or("?")),
    fmi.lineno(),
    indent = depth * 2,
  );
}

fn main() {
  env_logger::init();

  FUNCTION_ENTRY.activate();
  FUNCTION_RETURN.activate();
  log::info!(
    "markers active: {} / {}",
    FUNCTION_ENTRY.name(),
    FUNCTION_RETURN.name()
  );

  let errors = ErrorSlot::new();
  let module = DemoFrame::new(&errors, "script.py", "<module>", 1);
  let main_fn = DemoFrame::new(&errors, "script.py", "main", 3);
  let helper = DemoFrame::new(&errors, "helpers.py", "resolve", 42);

  println!("=== marker walkthrough ===");

  // What an attached tracer would see: one entry per frame going in, one
  // return per frame coming back out, innermost first.
  let stack = [&module, &main_fn, &helper];
  for (depth, frame) in stack.iter().enumerate() {
    on_function_entry(*frame);
    show("=>", frame, depth);
  }
  for (depth, frame) in stack.iter().enumerate().rev() {
    on_function_return(*frame);
    show("<=", frame, depth);
  }
}
