/// Creates a `String` from anything that can be
/// converted into one.
///
/// # Examples
/// ```
/// use gfxbuild_utils::string;
///
/// let name = string!("gfx1151");
/// assert_eq!(name, String::from("gfx1151"));
/// ```
#[macro_export]
macro_rules! string {
    ($str:expr) => {
        ::std::string::String::from($str)
    };
}
