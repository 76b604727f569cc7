//! `wasm_exports!`: WASM shells exported as `_<name>`.

/// Declare WASM exports for one module.
///
/// Emits one `#[no_mangle] extern "C"` shell per declaration and a registrar
/// listing them in an [`ExportsBuilder`](hostbridge_registry::ExportsBuilder).
/// Shell names carry no module, so export names must be unique per binary.
///
/// ```ignore
/// hostbridge_backends::wasm_exports! {
///     module: InteropNativeModule,
///     registrar: register_interop,
///     exports: {
///         fn GetAnswer() -> KInt = answer;
///         ctx fn Reenter(kind: KInt) -> KInt = reenter;
///     }
/// }
/// ```
#[macro_export]
macro_rules! wasm_exports {
    (
        module: $module:ident,
        registrar: $registrar:ident,
        exports: { $($items:tt)* } $(,)?
    ) => {
        $crate::__export_items!(__wasm_shell item [$module] $($items)*);

        pub fn $registrar(builder: &mut $crate::__private::ExportsBuilder) {
            $crate::__export_items!(__wasm_shell (register builder) [$module] $($items)*);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wasm_shell {
    (item plain [$module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            #[unsafe(no_mangle)]
            pub extern "C" fn [<_ $name>](
                $($arg: <$ty as $crate::__private::FromHost<$crate::wasm::Wasm>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::ToHost<$crate::wasm::Wasm>>::Interop {
                $crate::__private::tracing::trace!(export = stringify!($name), "wasm call");
                $crate::__private::Invoke::<$crate::wasm::Wasm, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke(
                    &$imp,
                    &$crate::wasm::LinearMemory,
                    ($($arg,)*),
                )
            }
        }
    };

    (item context [$module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            #[unsafe(no_mangle)]
            pub extern "C" fn [<_ $name>](
                $($arg: <$ty as $crate::__private::FromHost<$crate::wasm::Wasm>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::ToHost<$crate::wasm::Wasm>>::Interop {
                $crate::__private::tracing::trace!(export = stringify!($name), "wasm call");
                $crate::__private::InvokeWithContext::<$crate::wasm::Wasm, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke_with_context(
                    &$imp,
                    &$crate::wasm::LinearMemory,
                    ($($arg,)*),
                )
            }
        }
    };

    (item direct [$module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case)]
            #[unsafe(no_mangle)]
            pub extern "C" fn [<_ $name>](
                $($arg: <$ty as $crate::__private::DirectFromHost<$crate::wasm::Wasm>>::Interop),*
            ) -> <$crate::__ret_ty!($($ret)?) as $crate::__private::DirectToHost<$crate::wasm::Wasm>>::Interop {
                $crate::__private::InvokeDirect::<$crate::wasm::Wasm, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke_direct(
                    &$imp,
                    ($($arg,)*),
                )
            }
        }
    };

    ((register $builder:ident) $variant:ident [$module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            $crate::__register_export!($builder $variant $module $name [$($ty),*] [$($ret)?] [<_ $name>]);
        }
    };
}
