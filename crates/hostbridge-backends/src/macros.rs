//! Declaration munchers shared by the `*_exports!` macros.
//!
//! An export block is a list of declarations:
//!
//! ```ignore
//! fn GetAnswer() -> KInt = answer;
//! fn Log(message: KStringPtr) = log;
//! ctx fn Reenter(kind: KInt) -> KInt = reenter;
//! direct fn Add(a: KInt, b: KInt) -> KInt = add;
//! ```
//!
//! [`__export_items!`] walks the list and forwards each declaration to a
//! backend shell macro twice: once in `item` mode to emit the extern shell,
//! once in `(register builder)` mode to emit the `add_method` call.

#[doc(hidden)]
#[macro_export]
macro_rules! __export_items {
    ($shell:ident $mode:tt [$($cfg:tt)*]) => {};

    ($shell:ident $mode:tt [$($cfg:tt)*]
        ctx fn $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? = $imp:path;
        $($rest:tt)*
    ) => {
        $crate::$shell!($mode context [$($cfg)*] $name [$($arg : $ty),*] [$($ret)?] $imp);
        $crate::__export_items!($shell $mode [$($cfg)*] $($rest)*);
    };

    ($shell:ident $mode:tt [$($cfg:tt)*]
        direct fn $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? = $imp:path;
        $($rest:tt)*
    ) => {
        $crate::$shell!($mode direct [$($cfg)*] $name [$($arg : $ty),*] [$($ret)?] $imp);
        $crate::__export_items!($shell $mode [$($cfg)*] $($rest)*);
    };

    ($shell:ident $mode:tt [$($cfg:tt)*]
        fn $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? = $imp:path;
        $($rest:tt)*
    ) => {
        $crate::$shell!($mode plain [$($cfg)*] $name [$($arg : $ty),*] [$($ret)?] $imp);
        $crate::__export_items!($shell $mode [$($cfg)*] $($rest)*);
    };
}

/// Return type of a declaration; `()` when none is written.
#[doc(hidden)]
#[macro_export]
macro_rules! __ret_ty {
    () => { () };
    ($ret:ty) => { $ret };
}

/// Return kind spelling of a declaration; `void` when none is written.
#[doc(hidden)]
#[macro_export]
macro_rules! __ret_spelling {
    () => { $crate::__private::VOID_KIND };
    ($ret:ty) => { stringify!($ret) };
}

/// Flags recorded for a declaration variant.
#[doc(hidden)]
#[macro_export]
macro_rules! __variant_flags {
    (plain) => { $crate::__private::ExportFlags::empty() };
    (context) => { $crate::__private::ExportFlags::CONTEXT };
    (direct) => { $crate::__private::ExportFlags::DIRECT };
}

/// `builder.add_method(...)` for one declaration whose shell is `$shell_fn`.
#[doc(hidden)]
#[macro_export]
macro_rules! __register_export {
    ($builder:ident $variant:ident $module:ident $name:ident [$($ty:ty),*] [$($ret:ty)?] $shell_fn:path) => {
        $builder.add_method(
            stringify!($module),
            concat!("_", stringify!($name)),
            &$crate::__private::Signature::from_parts(
                $crate::__ret_spelling!($($ret)?),
                &[$(stringify!($ty)),*],
            )
            .to_string(),
            $crate::__private::NativeEntry::new($shell_fn as *const ::std::ffi::c_void),
            $crate::__variant_flags!($variant),
        );
    };
}
